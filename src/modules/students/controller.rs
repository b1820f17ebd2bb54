use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use thrive_core::AppError;
use thrive_models::ids::{StudentId, StudentPackageId};
use thrive_models::{BookingFilterParams, PaginatedBookingsResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{RequireAdmin, RequireStudent};
use crate::modules::bookings::service::BookingService;
use crate::modules::students::model::{CreateStudentDto, PackageUse, Student, StudentPackageView};
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created or updated", body = Student),
        (status = 403, description = "Admin only"),
        (status = 409, description = "WordPress user already linked"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_student(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = StudentService::create_student(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students/me",
    responses(
        (status = 200, description = "The calling student", body = Student),
        (status = 403, description = "Students only")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::get_student(&state.db, auth_user.student_id()?).await?;
    Ok(Json(student))
}

#[utoipa::path(
    get,
    path = "/api/students/me/packages",
    responses(
        (status = 200, description = "The caller's packages", body = Vec<StudentPackageView>),
        (status = 403, description = "Students only")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_packages(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Vec<StudentPackageView>>, AppError> {
    let packages = StudentService::list_packages(&state.db, auth_user.student_id()?).await?;
    Ok(Json(packages))
}

#[utoipa::path(
    get,
    path = "/api/students/me/packages/{package_id}/uses",
    params(("package_id" = Uuid, Path, description = "Package ID")),
    responses(
        (status = 200, description = "Credit ledger for the package", body = Vec<PackageUse>),
        (status = 404, description = "Package not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_package_uses(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Path(package_id): Path<Uuid>,
) -> Result<Json<Vec<PackageUse>>, AppError> {
    let uses = StudentService::list_package_uses(
        &state.db,
        auth_user.student_id()?,
        StudentPackageId::from(package_id),
    )
    .await?;
    Ok(Json(uses))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, AppError> {
    let student = StudentService::get_student(&state.db, StudentId::from(id)).await?;
    Ok(Json(student))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/packages",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student packages", body = Vec<StudentPackageView>),
        (status = 403, description = "Admin only")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_packages(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StudentPackageView>>, AppError> {
    let packages = StudentService::list_packages(&state.db, StudentId::from(id)).await?;
    Ok(Json(packages))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/bookings",
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        BookingFilterParams
    ),
    responses(
        (status = 200, description = "Student bookings", body = PaginatedBookingsResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_bookings(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Query(filters): Query<BookingFilterParams>,
) -> Result<Json<PaginatedBookingsResponse>, AppError> {
    let bookings =
        BookingService::list_student_bookings(&state.db, StudentId::from(id), filters).await?;
    Ok(Json(bookings))
}
