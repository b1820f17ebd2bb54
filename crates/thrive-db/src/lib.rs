//! # Thrive DB
//!
//! PostgreSQL pool setup. The URL comes from `DATABASE_URL`; the pool size
//! from `DATABASE_MAX_CONNECTIONS` (default 10).
//!
//! ```ignore
//! let pool = thrive_db::init_db_pool().await;
//! ```

use std::env;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use sqlx::PgPool;

/// Connects the application pool.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset or the database is unreachable. This is
/// only called during startup.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    tracing::info!(max_connections, "Connecting to database");

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .expect("Failed to connect to database")
}
