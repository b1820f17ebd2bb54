use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{create_payment_intent, stripe_webhook};

pub fn init_payments_router() -> Router<AppState> {
    Router::new()
        .route("/intents", post(create_payment_intent))
        .route("/webhook", post(stripe_webhook))
}
