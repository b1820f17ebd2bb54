//! Sessions: scheduled class instances.
//!
//! A session moves through a small state machine:
//!
//! ```text
//! DRAFT ──► SCHEDULED ──► COMPLETED
//!   │           │
//!   └───────────┴──────► CANCELLED
//! ```
//!
//! `DRAFT` sessions exist only while a private-lesson payment is pending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thrive_core::serde::{deserialize_optional_datetime, deserialize_optional_uuid};
use thrive_core::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ids::{SessionId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "session_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Private,
    Group,
    Course,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "session_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Draft,
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled) | (Draft, Cancelled) | (Scheduled, Completed) | (Scheduled, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Draft => "DRAFT",
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Session {
    pub id: SessionId,
    pub teacher_id: TeacherId,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub title: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Maximum number of active (draft or confirmed) bookings
    pub capacity: i32,
    pub meeting_url: Option<String>,
    /// Payment intent that created this session as a draft, if any
    pub source_payment_id: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_at <= now
    }
}

fn validate_session_window(dto: &CreateSessionDto) -> Result<(), ValidationError> {
    if dto.end_at <= dto.start_at {
        return Err(ValidationError::new("session_window")
            .with_message("end_at must be after start_at".into()));
    }
    if dto.session_type == SessionType::Private {
        return Err(ValidationError::new("session_type")
            .with_message("private sessions are created through bookings".into()));
    }
    Ok(())
}

/// Group or course session published by staff.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_session_window"))]
pub struct CreateSessionDto {
    pub teacher_id: TeacherId,
    pub session_type: SessionType,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[validate(range(min = 1, max = 100))]
    pub capacity: i32,
    #[validate(url)]
    pub meeting_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelSessionDto {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub session_type: Option<SessionType>,
    /// Sessions starting at or after this instant
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub from: Option<DateTime<Utc>>,
    /// Sessions starting before this instant
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub to: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedSessionsResponse {
    pub data: Vec<Session>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn legal_transitions() {
        use SessionStatus::*;
        assert!(Draft.can_transition_to(Scheduled));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
    }

    #[test]
    fn illegal_transitions() {
        use SessionStatus::*;
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Scheduled.can_transition_to(Draft));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Draft.is_terminal());
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Scheduled).unwrap(),
            "\"SCHEDULED\""
        );
    }

    fn dto(session_type: SessionType, minutes: i64) -> CreateSessionDto {
        let start = Utc::now() + Duration::days(2);
        CreateSessionDto {
            teacher_id: TeacherId::new(),
            session_type,
            title: Some("Conversation club".to_string()),
            start_at: start,
            end_at: start + Duration::minutes(minutes),
            capacity: 8,
            meeting_url: Some("https://meet.example.com/abc".to_string()),
        }
    }

    #[test]
    fn create_session_validation() {
        assert!(dto(SessionType::Group, 60).validate().is_ok());
        assert!(dto(SessionType::Group, 0).validate().is_err());
        assert!(dto(SessionType::Private, 60).validate().is_err());

        let mut no_room = dto(SessionType::Course, 90);
        no_room.capacity = 0;
        assert!(no_room.validate().is_err());
    }
}
