pub use thrive_models::sessions::*;
