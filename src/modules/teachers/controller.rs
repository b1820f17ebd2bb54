use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use thrive_core::AppError;
use thrive_models::ids::{AvailabilityId, TeacherId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireAdmin, RequireStaff};
use crate::modules::teachers::model::{
    AvailabilityQuery, CreateAvailabilityDto, CreateTeacherDto, Teacher, TeacherAvailability,
    TeacherAvailabilityResponse,
};
use crate::modules::teachers::service::TeacherService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

fn ensure_can_manage(auth_user: &AuthUser, teacher_id: TeacherId) -> Result<(), AppError> {
    if auth_user.can_manage_teacher(teacher_id) {
        Ok(())
    } else {
        Err(AppError::forbidden(anyhow!(
            "You can only manage your own availability"
        )))
    }
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    responses(
        (status = 200, description = "Active teachers", body = Vec<Teacher>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_teachers(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Teacher>>, AppError> {
    let teachers = TeacherService::list_teachers(&state.db).await?;
    Ok(Json(teachers))
}

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher created", body = Teacher),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already used"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_teacher(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = TeacherService::create_teacher(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = TeacherService::get_teacher(&state.db, TeacherId::from(id)).await?;
    Ok(Json(teacher))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}/availability-rules",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Recurring rules and blackouts", body = Vec<TeacherAvailability>),
        (status = 403, description = "Not your availability"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_availability_rules(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TeacherAvailability>>, AppError> {
    let teacher_id = TeacherId::from(id);
    ensure_can_manage(&auth_user, teacher_id)?;
    let rows = TeacherService::list_availability(&state.db, teacher_id).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/teachers/{id}/availability-rules",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    request_body = CreateAvailabilityDto,
    responses(
        (status = 201, description = "Availability entry added", body = TeacherAvailability),
        (status = 403, description = "Not your availability"),
        (status = 404, description = "Teacher not found"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn add_availability_rule(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateAvailabilityDto>,
) -> Result<(StatusCode, Json<TeacherAvailability>), AppError> {
    let teacher_id = TeacherId::from(id);
    ensure_can_manage(&auth_user, teacher_id)?;
    let row = TeacherService::add_availability(&state.db, teacher_id, dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{id}/availability-rules/{rule_id}",
    params(
        ("id" = Uuid, Path, description = "Teacher ID"),
        ("rule_id" = Uuid, Path, description = "Availability entry ID")
    ),
    responses(
        (status = 204, description = "Availability entry removed"),
        (status = 403, description = "Not your availability"),
        (status = 404, description = "Availability entry not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_availability_rule(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path((id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let teacher_id = TeacherId::from(id);
    ensure_can_manage(&auth_user, teacher_id)?;
    TeacherService::delete_availability(&state.db, teacher_id, AvailabilityId::from(rule_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}/availability",
    params(("id" = Uuid, Path, description = "Teacher ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Bookable UTC windows", body = TeacherAvailabilityResponse),
        (status = 400, description = "Invalid or too wide range"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_availability(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<TeacherAvailabilityResponse>, AppError> {
    let availability = TeacherService::expand_availability(
        &state.db,
        &state.booking_config,
        TeacherId::from(id),
        query,
    )
    .await?;
    Ok(Json(availability))
}
