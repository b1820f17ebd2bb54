//! # Thrive CLI
//!
//! Maintenance jobs for the booking database, meant for cron and for local
//! development.
//!
//! ```ignore
//! use thrive_cli::import_products_file;
//!
//! let count = import_products_file(&pool, "products.json".as_ref()).await?;
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::PgPool;
use thrive::modules::products::service::ProductService;
use thrive::modules::sessions::service::{ExpiredDrafts, SessionService};
use thrive_auth::{Role, create_access_token};
use thrive_config::JwtConfig;
use thrive_core::AppError;
use thrive_models::products::ProductImportRow;
use uuid::Uuid;

fn app_error(e: AppError) -> anyhow::Error {
    e.error.context(format!("status {}", e.status))
}

/// Parse a JSON array of product rows.
pub fn parse_product_rows(raw: &str) -> Result<Vec<ProductImportRow>> {
    serde_json::from_str(raw).context("products file must be a JSON array of product rows")
}

/// Upsert every product in the file, all or nothing.
pub async fn import_products_file(pool: &PgPool, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let rows = parse_product_rows(&raw)?;
    ProductService::import_products(pool, rows)
        .await
        .map_err(app_error)
}

pub async fn complete_sessions(pool: &PgPool) -> Result<u64> {
    SessionService::complete_ended_sessions(pool)
        .await
        .map_err(app_error)
}

pub async fn expire_drafts(pool: &PgPool, older_than_minutes: i64) -> Result<ExpiredDrafts> {
    anyhow::ensure!(older_than_minutes > 0, "--older-than-minutes must be positive");
    SessionService::expire_stale_drafts(pool, older_than_minutes)
        .await
        .map_err(app_error)
}

/// Mint an access token for local development.
pub fn issue_token(subject: Uuid, email: &str, role: &str, config: &JwtConfig) -> Result<String> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    create_access_token(subject, email, role, config).map_err(app_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_models::products::ServiceType;

    #[test]
    fn parses_product_rows() {
        let rows = parse_product_rows(
            r#"[{
                "service_key": "pack-10",
                "service_type": "PACKAGE",
                "stripe_product_id": "prod_1",
                "stripe_price_id": "price_1",
                "unit_amount_cents": 25000,
                "currency": "eur",
                "credits": 10,
                "session_minutes": 60,
                "validity_days": 180
            }]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product.service_type, ServiceType::Package);
        assert!(rows[0].product.active);
    }

    #[test]
    fn rejects_non_array_files() {
        assert!(parse_product_rows(r#"{"service_key": "x"}"#).is_err());
    }

    #[test]
    fn issues_verifiable_tokens() {
        let config = JwtConfig {
            secret: "cli-test-secret".to_string(),
            access_token_expiry: 600,
        };
        let subject = Uuid::new_v4();
        let token = issue_token(subject, "ana@example.com", "teacher", &config).unwrap();
        let claims = thrive_auth::verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, subject.to_string());
        assert_eq!(claims.role, Role::Teacher);

        assert!(issue_token(subject, "ana@example.com", "owner", &config).is_err());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_expire_drafts_rejects_zero(pool: PgPool) {
        assert!(expire_drafts(&pool, 0).await.is_err());
        assert_eq!(expire_drafts(&pool, 60).await.unwrap(), ExpiredDrafts::default());
    }
}
