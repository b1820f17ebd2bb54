//! # Thrive API
//!
//! Booking and payments backend for a language school, built with Axum and
//! PostgreSQL. The WordPress site renders the UI; this service owns money and
//! seats.
//!
//! ## Overview
//!
//! - **Payments**: Stripe payment intents for single lessons and credit
//!   packages, with a signed, idempotent webhook that fulfills purchases
//! - **Bookings**: spending package credits on sessions, with a ledger of
//!   every credit used and refunded
//! - **Sessions**: private, group and course sessions with a small status
//!   state machine
//! - **Teachers**: weekly availability rules and blackouts, expanded into
//!   bookable UTC windows in the teacher's time zone
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── config/       # Server config + re-exports of thrive-config
//! ├── middleware/   # JWT extractor and role guards
//! ├── modules/      # Feature modules
//! │   ├── payments/ # Intents, webhook, fulfillment
//! │   ├── bookings/ # Credit bookings and cancellations
//! │   ├── sessions/ # Session lifecycle
//! │   ├── teachers/ # Teachers and availability
//! │   ├── products/ # Stripe product map
//! │   └── students/ # Students and their packages
//! ├── docs.rs       # OpenAPI document
//! ├── logging.rs    # Request logging + subscriber setup
//! └── metrics.rs    # Prometheus metrics
//! ```
//!
//! Each feature module follows the same layout:
//!
//! - `controller.rs`: HTTP handlers
//! - `service.rs`: business logic and SQL
//! - `model.rs`: models, mostly re-exported from `thrive-models`
//! - `router.rs`: Axum router
//!
//! ## Roles
//!
//! | Role | Can |
//! |------|-----|
//! | Admin | everything |
//! | Teacher | manage own availability and sessions |
//! | Student | pay, book with credits, cancel own bookings |
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod config;
pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use thrive_auth;
pub use thrive_config;
pub use thrive_core;
pub use thrive_db;
pub use thrive_models;
