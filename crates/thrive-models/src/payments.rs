//! Payment intent and webhook DTOs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::ids::{BookingId, SessionId, TeacherId};

/// What a successful payment turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Credits added to a new student package
    Package,
    /// A single seat in one session
    Session,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentKind::Package => "package",
            PaymentKind::Session => "session",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(PaymentKind::Package),
            "session" => Ok(PaymentKind::Session),
            other => Err(format!("unknown payment kind: {other}")),
        }
    }
}

fn validate_intent_target(dto: &CreatePaymentIntentDto) -> Result<(), ValidationError> {
    if dto.teacher_id.is_some() != dto.start_at.is_some() {
        return Err(ValidationError::new("private_slot")
            .with_message("teacher_id and start_at must be given together".into()));
    }
    if dto.session_id.is_some() && dto.teacher_id.is_some() {
        return Err(ValidationError::new("intent_target")
            .with_message("give either session_id or teacher_id/start_at, not both".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_intent_target"))]
pub struct CreatePaymentIntentDto {
    #[validate(length(min = 1, max = 100))]
    pub service_key: String,
    /// Units to buy; only packages accept more than one
    #[validate(range(min = 1, max = 20))]
    pub quantity: Option<i32>,
    /// Group/course session to join, or session to spend a package's first credit on
    pub session_id: Option<SessionId>,
    /// Private lesson teacher
    pub teacher_id: Option<TeacherId>,
    /// Private lesson start
    pub start_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub kind: PaymentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
}

/// How a webhook event was handled. Stored alongside the event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    PackageFulfilled,
    AlreadyFulfilled,
    DraftsPromoted,
    DraftsCancelled,
    /// Payment arrived for drafts that were already cancelled; the student
    /// received a one-credit package instead
    CreditIssued,
    Ignored,
    AlreadyProcessed,
}

impl WebhookOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            WebhookOutcome::PackageFulfilled => "package_fulfilled",
            WebhookOutcome::AlreadyFulfilled => "already_fulfilled",
            WebhookOutcome::DraftsPromoted => "drafts_promoted",
            WebhookOutcome::DraftsCancelled => "drafts_cancelled",
            WebhookOutcome::CreditIssued => "credit_issued",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::AlreadyProcessed => "already_processed",
        }
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: WebhookOutcome,
}
