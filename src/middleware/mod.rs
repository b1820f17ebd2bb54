//! Request extractors for authentication and role checks.
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. [`auth::AuthUser`] verifies the JWT and exposes its claims
//! 3. Role guards ([`auth::RequireAdmin`], [`auth::RequireStaff`],
//!    [`auth::RequireStudent`]) reject callers with the wrong role
//!
//! ```ignore
//! async fn create_teacher(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
//!     // only admins reach this point
//! }
//! ```

pub mod auth;
