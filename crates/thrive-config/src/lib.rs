//! # Thrive Config
//!
//! Configuration structures loaded from environment variables. Every struct
//! exposes `from_env()` and falls back to development defaults.
//!
//! - [`jwt`]: token signing secret and lifetime
//! - [`cors`]: allowed browser origins (the WordPress site)
//! - [`stripe`]: Stripe API key, webhook secret and tolerance
//! - [`booking`]: cancellation notice, availability range limits, session length
//!
//! # Example
//!
//! ```ignore
//! use thrive_config::{BookingConfig, StripeConfig};
//!
//! let stripe = StripeConfig::from_env();
//! let booking = BookingConfig::from_env();
//! ```

use std::str::FromStr;

pub mod booking;
pub mod cors;
pub mod jwt;
pub mod stripe;

pub use booking::BookingConfig;
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use stripe::StripeConfig;

/// Reads `key` and parses it, falling back to `default` when unset or invalid.
pub(crate) fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
