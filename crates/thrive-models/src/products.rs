//! Mapping from internal service keys to Stripe products and prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::ProductMapId;
use crate::sessions::SessionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Private,
    Group,
    Course,
    Package,
}

impl ServiceType {
    /// Session type a single-session product books into. `None` for packages.
    pub fn session_type(self) -> Option<SessionType> {
        match self {
            ServiceType::Private => Some(SessionType::Private),
            ServiceType::Group => Some(SessionType::Group),
            ServiceType::Course => Some(SessionType::Course),
            ServiceType::Package => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StripeProductMap {
    pub id: ProductMapId,
    pub service_key: String,
    pub service_type: ServiceType,
    pub stripe_product_id: String,
    pub stripe_price_id: String,
    pub unit_amount_cents: i64,
    /// ISO 4217, lowercase as Stripe expects
    pub currency: String,
    /// Credits granted per unit purchased
    pub credits: i32,
    pub session_minutes: i32,
    /// Package lifetime from purchase; `None` never expires
    pub validity_days: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service keys are lowercase slugs: `a-z`, `0-9`, `-` and `_`.
pub fn validate_service_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && key.len() <= 100
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("service_key")
            .with_message("service key must be a lowercase slug".into()))
    }
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(ValidationError::new("currency")
            .with_message("currency must be a lowercase ISO 4217 code".into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertProductDto {
    pub service_type: ServiceType,
    #[validate(length(min = 1, max = 255))]
    pub stripe_product_id: String,
    #[validate(length(min = 1, max = 255))]
    pub stripe_price_id: String,
    #[validate(range(min = 0))]
    pub unit_amount_cents: i64,
    #[validate(custom(function = "validate_currency"))]
    pub currency: String,
    #[validate(range(min = 1, max = 500))]
    pub credits: i32,
    #[validate(range(min = 15, max = 480))]
    pub session_minutes: i32,
    #[validate(range(min = 1, max = 3650))]
    pub validity_days: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One entry of a bulk import file.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductImportRow {
    #[validate(custom(function = "validate_service_key"))]
    pub service_key: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub product: UpsertProductDto,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilterParams {
    /// Include deactivated products (admin only)
    pub include_inactive: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_key_slugs() {
        assert!(validate_service_key("private-60").is_ok());
        assert!(validate_service_key("pack_10").is_ok());
        assert!(validate_service_key("").is_err());
        assert!(validate_service_key("Private 60").is_err());
    }

    #[test]
    fn package_has_no_session_type() {
        assert_eq!(ServiceType::Package.session_type(), None);
        assert_eq!(
            ServiceType::Group.session_type(),
            Some(SessionType::Group)
        );
    }

    #[test]
    fn import_row_flattens_product() {
        let row: ProductImportRow = serde_json::from_str(
            r#"{
                "service_key": "pack-10",
                "service_type": "PACKAGE",
                "stripe_product_id": "prod_123",
                "stripe_price_id": "price_123",
                "unit_amount_cents": 25000,
                "currency": "eur",
                "credits": 10,
                "session_minutes": 60,
                "validity_days": 180
            }"#,
        )
        .unwrap();
        assert!(row.validate().is_ok());
        assert!(row.product.active);
        assert_eq!(row.product.credits, 10);
    }

    #[test]
    fn rejects_bad_currency_and_credits() {
        let mut row: ProductImportRow = serde_json::from_str(
            r#"{
                "service_key": "group-90",
                "service_type": "GROUP",
                "stripe_product_id": "prod_1",
                "stripe_price_id": "price_1",
                "unit_amount_cents": 1500,
                "currency": "EURO",
                "credits": 1,
                "session_minutes": 90
            }"#,
        )
        .unwrap();
        assert!(row.validate().is_err());
        row.product.currency = "eur".to_string();
        row.product.credits = 0;
        assert!(row.validate().is_err());
    }
}
