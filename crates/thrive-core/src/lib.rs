//! # Thrive Core
//!
//! Foundational types shared by every Thrive crate:
//!
//! - [`errors`]: [`AppError`], an HTTP-aware wrapper around `anyhow::Error`
//! - [`pagination`]: query parameters and response metadata for list endpoints
//! - [`serde`]: lenient deserializers for query-string values
//!
//! # Example
//!
//! ```ignore
//! use thrive_core::{AppError, PaginationParams};
//!
//! let err = AppError::not_found(anyhow::anyhow!("Session not found"));
//! let params = PaginationParams::default();
//! assert_eq!(params.limit(), 20);
//! ```

pub mod errors;
pub mod pagination;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
