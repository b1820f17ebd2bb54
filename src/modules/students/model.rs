//! Student models, re-exported from `thrive-models` along with the package
//! types students own.

pub use thrive_models::packages::{PackageUse, StudentPackage, StudentPackageView};
pub use thrive_models::students::*;
