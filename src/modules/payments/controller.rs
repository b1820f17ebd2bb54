use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use thrive_core::AppError;
use tracing::instrument;

use crate::middleware::auth::RequireStudent;
use crate::modules::payments::model::{CreatePaymentIntentDto, PaymentIntentResponse, WebhookAck};
use crate::modules::payments::service::PaymentService;
use crate::modules::payments::webhook::SIGNATURE_HEADER;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/payments/intents",
    request_body = CreatePaymentIntentDto,
    responses(
        (status = 201, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Product and target do not fit together"),
        (status = 404, description = "Product, session or teacher not found"),
        (status = 409, description = "Slot unavailable, session full or already booked"),
        (status = 422, description = "Validation failed"),
        (status = 502, description = "Payment provider failed")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    ValidatedJson(dto): ValidatedJson<CreatePaymentIntentDto>,
) -> Result<(StatusCode, Json<PaymentIntentResponse>), AppError> {
    let response = PaymentService::create_payment_intent(
        &state.db,
        state.payments.as_ref(),
        auth_user.student_id()?,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Stripe calls this endpoint; it authenticates through the signature header
/// instead of a bearer token.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex>")),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature, or unreadable event")
    ),
    tag = "Payments"
)]
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = PaymentService::handle_webhook(&state.db, &state.stripe_config, signature, &body)
        .await?;
    Ok(Json(ack))
}
