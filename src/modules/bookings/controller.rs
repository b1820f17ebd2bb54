use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use thrive_core::AppError;
use thrive_models::ids::BookingId;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireStudent};
use crate::modules::bookings::model::{
    BookWithCreditsDto, Booking, BookingFilterParams, CancelBookingDto, CancelBookingResponse,
    PaginatedBookingsResponse,
};
use crate::modules::bookings::service::BookingService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = BookWithCreditsDto,
    responses(
        (status = 201, description = "Seat booked with one credit", body = Booking),
        (status = 402, description = "No usable credits"),
        (status = 404, description = "Session, teacher or package not found"),
        (status = 409, description = "Session full, closed or already booked"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn book_with_credits(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    ValidatedJson(dto): ValidatedJson<BookWithCreditsDto>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = BookingService::book_with_credits(
        &state.db,
        &state.booking_config,
        auth_user.student_id()?,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    params(BookingFilterParams),
    responses(
        (status = 200, description = "The caller's bookings", body = PaginatedBookingsResponse),
        (status = 403, description = "Students only")
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(filters): Query<BookingFilterParams>,
) -> Result<Json<PaginatedBookingsResponse>, AppError> {
    let bookings =
        BookingService::list_student_bookings(&state.db, auth_user.student_id()?, filters).await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "Booking not found")
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking =
        BookingService::get_booking(&state.db, auth_user.student_scope()?, BookingId::from(id))
            .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingDto,
    responses(
        (status = 200, description = "Booking cancelled", body = CancelBookingResponse),
        (status = 403, description = "Not your booking"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already cancelled")
    ),
    tag = "Bookings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CancelBookingDto>,
) -> Result<Json<CancelBookingResponse>, AppError> {
    let response = BookingService::cancel_booking(
        &state.db,
        &state.booking_config,
        auth_user.student_scope()?,
        BookingId::from(id),
        dto.reason,
    )
    .await?;
    Ok(Json(response))
}
