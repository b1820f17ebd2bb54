use anyhow::anyhow;
use sqlx::{PgConnection, PgPool};
use thrive_core::AppError;
use tracing::instrument;
use validator::{Validate, ValidationError};

use crate::modules::products::model::{
    ProductImportRow, StripeProductMap, UpsertProductDto, validate_service_key,
};
use crate::validator::validation_error;

pub struct ProductService;

impl ProductService {
    #[instrument(skip(db))]
    pub async fn list_products(
        db: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<StripeProductMap>, AppError> {
        let products = sqlx::query_as::<_, StripeProductMap>(
            r#"SELECT * FROM stripe_product_map
               WHERE active OR $1
               ORDER BY service_type, service_key"#,
        )
        .bind(include_inactive)
        .fetch_all(db)
        .await?;

        Ok(products)
    }

    #[instrument(skip(db))]
    pub async fn get_product(
        db: &PgPool,
        service_key: &str,
        include_inactive: bool,
    ) -> Result<StripeProductMap, AppError> {
        sqlx::query_as::<_, StripeProductMap>(
            "SELECT * FROM stripe_product_map WHERE service_key = $1 AND (active OR $2)",
        )
        .bind(service_key)
        .bind(include_inactive)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Product {} not found", service_key)))
    }

    #[instrument(skip(db))]
    pub async fn upsert_product(
        db: &PgPool,
        service_key: &str,
        dto: UpsertProductDto,
    ) -> Result<StripeProductMap, AppError> {
        validate_service_key(service_key).map_err(key_error)?;
        let mut conn = db.acquire().await?;
        Self::upsert(&mut conn, service_key, &dto).await
    }

    #[instrument(skip(db))]
    pub async fn deactivate_product(
        db: &PgPool,
        service_key: &str,
    ) -> Result<StripeProductMap, AppError> {
        sqlx::query_as::<_, StripeProductMap>(
            r#"UPDATE stripe_product_map SET active = FALSE, updated_at = NOW()
               WHERE service_key = $1
               RETURNING *"#,
        )
        .bind(service_key)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Product {} not found", service_key)))
    }

    /// Upsert every row in one transaction. Returns the number of rows written.
    #[instrument(skip(db, rows), fields(rows = rows.len()))]
    pub async fn import_products(db: &PgPool, rows: Vec<ProductImportRow>) -> Result<usize, AppError> {
        for row in &rows {
            row.validate().map_err(|errors| {
                AppError::unprocessable(anyhow!(
                    "{}: {}",
                    row.service_key,
                    validation_error(errors).error
                ))
            })?;
        }

        let mut tx = db.begin().await?;
        for row in &rows {
            Self::upsert(&mut tx, &row.service_key, &row.product).await?;
        }
        tx.commit().await?;

        tracing::info!(count = rows.len(), "Imported products");
        Ok(rows.len())
    }

    async fn upsert(
        conn: &mut PgConnection,
        service_key: &str,
        dto: &UpsertProductDto,
    ) -> Result<StripeProductMap, AppError> {
        let product = sqlx::query_as::<_, StripeProductMap>(
            r#"INSERT INTO stripe_product_map
                   (service_key, service_type, stripe_product_id, stripe_price_id,
                    unit_amount_cents, currency, credits, session_minutes, validity_days, active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (service_key) DO UPDATE SET
                   service_type = EXCLUDED.service_type,
                   stripe_product_id = EXCLUDED.stripe_product_id,
                   stripe_price_id = EXCLUDED.stripe_price_id,
                   unit_amount_cents = EXCLUDED.unit_amount_cents,
                   currency = EXCLUDED.currency,
                   credits = EXCLUDED.credits,
                   session_minutes = EXCLUDED.session_minutes,
                   validity_days = EXCLUDED.validity_days,
                   active = EXCLUDED.active,
                   updated_at = NOW()
               RETURNING *"#,
        )
        .bind(service_key)
        .bind(dto.service_type)
        .bind(&dto.stripe_product_id)
        .bind(&dto.stripe_price_id)
        .bind(dto.unit_amount_cents)
        .bind(&dto.currency)
        .bind(dto.credits)
        .bind(dto.session_minutes)
        .bind(dto.validity_days)
        .bind(dto.active)
        .fetch_one(&mut *conn)
        .await?;

        Ok(product)
    }
}

fn key_error(err: ValidationError) -> AppError {
    AppError::unprocessable(anyhow!(
        "{}",
        err.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "invalid service key".to_string())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::products::model::ServiceType;
    use axum::http::StatusCode;

    fn dto(service_type: ServiceType, credits: i32) -> UpsertProductDto {
        UpsertProductDto {
            service_type,
            stripe_product_id: "prod_test".to_string(),
            stripe_price_id: "price_test".to_string(),
            unit_amount_cents: 4500,
            currency: "eur".to_string(),
            credits,
            session_minutes: 60,
            validity_days: Some(90),
            active: true,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_upsert_then_update(pool: PgPool) {
        let created = ProductService::upsert_product(&pool, "pack-5", dto(ServiceType::Package, 5))
            .await
            .unwrap();
        assert_eq!(created.credits, 5);

        let updated = ProductService::upsert_product(&pool, "pack-5", dto(ServiceType::Package, 6))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.credits, 6);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deactivated_products_are_hidden(pool: PgPool) {
        ProductService::upsert_product(&pool, "group-60", dto(ServiceType::Group, 1))
            .await
            .unwrap();
        ProductService::deactivate_product(&pool, "group-60").await.unwrap();

        assert!(ProductService::list_products(&pool, false).await.unwrap().is_empty());
        assert_eq!(ProductService::list_products(&pool, true).await.unwrap().len(), 1);

        let err = ProductService::get_product(&pool, "group-60", false)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(ProductService::get_product(&pool, "group-60", true).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_invalid_service_key(pool: PgPool) {
        let err = ProductService::upsert_product(&pool, "Bad Key", dto(ServiceType::Private, 1))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_import_is_all_or_nothing(pool: PgPool) {
        let good = ProductImportRow {
            service_key: "private-60".to_string(),
            product: dto(ServiceType::Private, 1),
        };
        let bad = ProductImportRow {
            service_key: "pack-0".to_string(),
            product: dto(ServiceType::Package, 0),
        };

        let err = ProductService::import_products(&pool, vec![good.clone(), bad])
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(ProductService::list_products(&pool, true).await.unwrap().is_empty());

        let count = ProductService::import_products(&pool, vec![good]).await.unwrap();
        assert_eq!(count, 1);
    }
}
