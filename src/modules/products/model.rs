pub use thrive_models::products::*;
