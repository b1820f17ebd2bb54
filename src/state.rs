use std::sync::Arc;

use sqlx::PgPool;
use thrive_db::init_db_pool;

use crate::config::{BookingConfig, CorsConfig, JwtConfig, StripeConfig};
use crate::modules::payments::provider::{PaymentProvider, StripeClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub stripe_config: StripeConfig,
    pub booking_config: BookingConfig,
    pub payments: Arc<dyn PaymentProvider>,
}

pub async fn init_app_state() -> AppState {
    let stripe_config = StripeConfig::from_env();
    AppState {
        db: init_db_pool().await,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        payments: Arc::new(StripeClient::new(&stripe_config)),
        stripe_config,
        booking_config: BookingConfig::from_env(),
    }
}
