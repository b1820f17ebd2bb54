//! # Thrive Auth
//!
//! JWT claims and token helpers. Tokens are minted by the WordPress side (or
//! `thrive-cli issue-token` in development) and verified on every request.
//!
//! ```ignore
//! use thrive_auth::{Role, create_access_token, verify_token};
//!
//! let token = create_access_token(student_id, "ana@example.com", Role::Student, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, Role::Student);
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, Role};
pub use jwt::{create_access_token, verify_token};
