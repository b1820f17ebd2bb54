use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use thrive_core::AppError;
use thrive_models::ids::SessionId;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireStaff};
use crate::modules::sessions::model::{
    CancelSessionDto, CreateSessionDto, PaginatedSessionsResponse, Session, SessionFilterParams,
};
use crate::modules::sessions::service::SessionService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Staff may only act on sessions they teach, unless they are admins.
async fn managed_session(
    state: &AppState,
    auth_user: &AuthUser,
    session_id: SessionId,
) -> Result<Session, AppError> {
    let session = SessionService::get_session(&state.db, session_id).await?;
    if !auth_user.can_manage_teacher(session.teacher_id) {
        return Err(AppError::forbidden(anyhow!(
            "You can only manage your own sessions"
        )));
    }
    Ok(session)
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    params(SessionFilterParams),
    responses(
        (status = 200, description = "Sessions", body = PaginatedSessionsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<SessionFilterParams>,
) -> Result<Json<PaginatedSessionsResponse>, AppError> {
    let sessions = SessionService::list_sessions(&state.db, filters).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionDto,
    responses(
        (status = 201, description = "Session scheduled", body = Session),
        (status = 403, description = "Not your session"),
        (status = 404, description = "Teacher not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateSessionDto>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    if !auth_user.can_manage_teacher(dto.teacher_id) {
        return Err(AppError::forbidden(anyhow!(
            "Teachers can only schedule their own sessions"
        )));
    }
    let session = SessionService::create_session(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = Session),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = SessionService::get_session(&state.db, SessionId::from(id)).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/complete",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session completed", body = Session),
        (status = 403, description = "Not your session"),
        (status = 409, description = "Session has not ended or is not scheduled")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn complete_session(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let session = managed_session(&state, &auth_user, SessionId::from(id)).await?;
    let session = SessionService::complete_session(&state.db, session.id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = CancelSessionDto,
    responses(
        (status = 200, description = "Session and its bookings cancelled", body = Session),
        (status = 403, description = "Not your session"),
        (status = 409, description = "Session already completed or cancelled")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_session(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CancelSessionDto>,
) -> Result<Json<Session>, AppError> {
    let session = managed_session(&state, &auth_user, SessionId::from(id)).await?;
    let session = SessionService::cancel_session(&state.db, session.id, dto.reason).await?;
    Ok(Json(session))
}
