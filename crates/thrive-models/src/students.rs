use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::StudentId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    /// Linked WordPress account, when the student signed up through the site
    pub wp_user_id: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub wp_user_id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub stripe_customer_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_student_validation() {
        let dto = CreateStudentDto {
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lima".to_string(),
            wp_user_id: Some(42),
            stripe_customer_id: None,
        };
        assert!(dto.validate().is_ok());

        let bad = CreateStudentDto {
            email: "not-an-email".to_string(),
            ..dto
        };
        assert!(bad.validate().is_err());
    }
}
