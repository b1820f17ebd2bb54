//! Bookings: a student's seat in a session.
//!
//! ```text
//! DRAFT ──► CONFIRMED ──► CANCELLED
//!   └──────────────────────►┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thrive_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{BookingId, SessionId, StudentId, StudentPackageId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Draft, Confirmed) | (Draft, Cancelled) | (Confirmed, Cancelled)
        )
    }

    /// Draft and confirmed bookings both hold a seat.
    pub fn holds_seat(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Draft => "DRAFT",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: BookingId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub status: BookingStatus,
    /// Package whose credit paid for this booking
    pub student_package_id: Option<StudentPackageId>,
    /// Payment intent that paid for this booking directly
    pub stripe_payment_intent_id: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_booking_target(dto: &BookWithCreditsDto) -> Result<(), ValidationError> {
    match (dto.session_id, dto.teacher_id, dto.start_at) {
        (Some(_), None, None) | (None, Some(_), Some(_)) => Ok(()),
        _ => Err(ValidationError::new("booking_target").with_message(
            "provide either session_id, or teacher_id together with start_at".into(),
        )),
    }
}

/// Book a seat paying with a package credit.
///
/// Either join an existing group/course `session_id`, or request a private
/// lesson with `teacher_id` + `start_at`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_booking_target"))]
pub struct BookWithCreditsDto {
    pub session_id: Option<SessionId>,
    pub teacher_id: Option<TeacherId>,
    pub start_at: Option<DateTime<Utc>>,
    /// Private lesson length; defaults to the configured session length
    #[validate(range(min = 15, max = 240))]
    pub duration_minutes: Option<i64>,
    /// Package to spend; defaults to the usable package expiring first
    pub student_package_id: Option<StudentPackageId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBookingDto {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CancelBookingResponse {
    pub booking: Booking,
    /// Whether the consumed credit went back to the package
    pub credit_refunded: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingFilterParams {
    pub status: Option<BookingStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedBookingsResponse {
    pub data: Vec<Booking>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_transitions() {
        use BookingStatus::*;
        assert!(Draft.can_transition_to(Confirmed));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Draft));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn cancelled_frees_the_seat() {
        assert!(BookingStatus::Draft.holds_seat());
        assert!(BookingStatus::Confirmed.holds_seat());
        assert!(!BookingStatus::Cancelled.holds_seat());
    }

    fn empty() -> BookWithCreditsDto {
        BookWithCreditsDto {
            session_id: None,
            teacher_id: None,
            start_at: None,
            duration_minutes: None,
            student_package_id: None,
        }
    }

    #[test]
    fn booking_target_must_be_unambiguous() {
        assert!(empty().validate().is_err());

        let group = BookWithCreditsDto {
            session_id: Some(SessionId::new()),
            ..empty()
        };
        assert!(group.validate().is_ok());

        let private = BookWithCreditsDto {
            teacher_id: Some(TeacherId::new()),
            start_at: Some(Utc::now()),
            duration_minutes: Some(45),
            ..empty()
        };
        assert!(private.validate().is_ok());

        let both = BookWithCreditsDto {
            session_id: Some(SessionId::new()),
            teacher_id: Some(TeacherId::new()),
            start_at: Some(Utc::now()),
            ..empty()
        };
        assert!(both.validate().is_err());

        let too_long = BookWithCreditsDto {
            duration_minutes: Some(600),
            ..private
        };
        assert!(too_long.validate().is_err());
    }
}
