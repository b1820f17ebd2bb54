use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::ids::TeacherId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    pub display_name: String,
    pub email: String,
    /// IANA time zone that recurring availability is written in
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Teacher {
    /// Parsed time zone. Stored values are validated on write; anything
    /// unparseable reads as UTC and is logged.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(
                teacher.id = %self.id,
                timezone = %self.timezone,
                "Unknown teacher time zone; using UTC"
            );
            Tz::UTC
        })
    }
}

pub fn validate_timezone(timezone: &str) -> Result<(), ValidationError> {
    timezone.parse::<Tz>().map(|_| ()).map_err(|_| {
        ValidationError::new("timezone").with_message("unknown IANA time zone".into())
    })
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 150))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
    /// Defaults to `UTC`
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timezone_must_be_iana() {
        assert!(validate_timezone("Europe/Lisbon").is_ok());
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn unparseable_timezone_reads_as_utc() {
        let now = Utc::now();
        let teacher = Teacher {
            id: TeacherId::new(),
            display_name: "Marta".to_string(),
            email: "marta@example.com".to_string(),
            timezone: "nowhere".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(teacher.tz(), Tz::UTC);

        let lisbon = Teacher {
            timezone: "Europe/Lisbon".to_string(),
            ..teacher
        };
        assert_eq!(lisbon.tz(), chrono_tz::Europe::Lisbon);
    }
}
