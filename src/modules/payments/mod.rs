pub mod controller;
pub mod model;
pub mod provider;
pub mod router;
pub mod service;
pub mod webhook;

pub use model::*;
pub use router::init_payments_router;
