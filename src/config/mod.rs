//! Configuration for the Thrive API.
//!
//! Feature configuration lives in the `thrive-config` crate and is re-exported
//! here. [`ServerConfig`] holds the listener ports, which only the binary
//! needs.
//!
//! # Environment Variables
//!
//! - `PORT`: HTTP listener port (default 3000)
//! - `METRICS_PORT`: Prometheus listener port (default 9090)

pub use thrive_config::{BookingConfig, CorsConfig, JwtConfig, StripeConfig};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: port_from_env("PORT", 3000),
            metrics_port: port_from_env("METRICS_PORT", 9090),
        }
    }
}

fn port_from_env(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
