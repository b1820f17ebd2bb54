//! Stripe credentials and webhook verification settings.
//!
//! # Environment Variables
//!
//! - `STRIPE_SECRET_KEY`: API key used for payment intent creation
//! - `STRIPE_WEBHOOK_SECRET`: `whsec_...` signing secret for webhooks
//! - `STRIPE_API_BASE`: override for tests and stripe-mock (default `https://api.stripe.com`)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS`: accepted clock skew for signed timestamps (default 300)

use std::env;

use crate::parse_env;

#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn from_env() -> Self {
        let config = Self {
            secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            webhook_tolerance_secs: parse_env("STRIPE_WEBHOOK_TOLERANCE_SECS", 300),
        };

        if config.secret_key.is_empty() {
            tracing::warn!("STRIPE_SECRET_KEY is not set; payment intent creation will fail");
        }
        if config.webhook_secret.is_empty() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be rejected");
        }

        config
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[redacted]")
            .field("webhook_secret", &"[redacted]")
            .field("api_base", &self.api_base)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}
