use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use thrive_auth::{Claims, Role, verify_token};
use thrive_core::AppError;
use thrive_models::ids::{StudentId, TeacherId};
use uuid::Uuid;

use crate::state::AppState;

/// Extractor that validates the bearer token and provides its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    pub fn subject_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized(anyhow!("Invalid subject in token")))
    }

    /// The caller's student id. Fails for non-student tokens.
    pub fn student_id(&self) -> Result<StudentId, AppError> {
        if self.0.role != Role::Student {
            return Err(AppError::forbidden(anyhow!("Only students can do this")));
        }
        self.subject_id().map(StudentId::from)
    }

    /// Whether the caller may manage data owned by `teacher_id`.
    pub fn can_manage_teacher(&self, teacher_id: TeacherId) -> bool {
        match self.0.role {
            Role::Admin => true,
            Role::Teacher => self
                .subject_id()
                .is_ok_and(|id| TeacherId::from(id) == teacher_id),
            Role::Student => false,
        }
    }

    /// `None` for admins (every student), `Some(id)` for the calling student.
    /// Teachers have no student scope.
    pub fn student_scope(&self) -> Result<Option<StudentId>, AppError> {
        match self.0.role {
            Role::Admin => Ok(None),
            Role::Student => self.student_id().map(Some),
            Role::Teacher => Err(AppError::forbidden(anyhow!(
                "Teachers cannot access student records"
            ))),
        }
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized(anyhow!("Missing authorization header")))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized(anyhow!("Invalid authorization header format")))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Builds an extractor that only admits the listed roles.
#[macro_export]
macro_rules! require_role {
    ($name:ident, $($role:expr),+ $(,)?) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = thrive_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if ![$($role),+].contains(&auth_user.role()) {
                    return Err(thrive_core::AppError::forbidden(anyhow::anyhow!(
                        "Access denied for role {}",
                        auth_user.role()
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_role!(RequireAdmin, Role::Admin);
require_role!(RequireStaff, Role::Admin, Role::Teacher);
require_role!(RequireStudent, Role::Student);
