pub use thrive_models::bookings::*;
pub use thrive_models::packages::{PackageUse, StudentPackage};
