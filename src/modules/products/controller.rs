use axum::{
    Json,
    extract::{Path, Query, State},
};
use thrive_core::AppError;
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireAdmin};
use crate::modules::products::model::{ProductFilterParams, StripeProductMap, UpsertProductDto};
use crate::modules::products::service::ProductService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductFilterParams),
    responses(
        (status = 200, description = "Purchasable products", body = Vec<StripeProductMap>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Products",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<ProductFilterParams>,
) -> Result<Json<Vec<StripeProductMap>>, AppError> {
    let include_inactive = auth_user.is_admin() && filters.include_inactive.unwrap_or(false);
    let products = ProductService::list_products(&state.db, include_inactive).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{service_key}",
    params(("service_key" = String, Path, description = "Service key")),
    responses(
        (status = 200, description = "Product", body = StripeProductMap),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Product not found")
    ),
    tag = "Products",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(service_key): Path<String>,
) -> Result<Json<StripeProductMap>, AppError> {
    let product =
        ProductService::get_product(&state.db, &service_key, auth_user.is_admin()).await?;
    Ok(Json(product))
}

#[utoipa::path(
    put,
    path = "/api/products/{service_key}",
    params(("service_key" = String, Path, description = "Service key")),
    request_body = UpsertProductDto,
    responses(
        (status = 200, description = "Product created or updated", body = StripeProductMap),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Products",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn upsert_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(service_key): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpsertProductDto>,
) -> Result<Json<StripeProductMap>, AppError> {
    let product = ProductService::upsert_product(&state.db, &service_key, dto).await?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{service_key}",
    params(("service_key" = String, Path, description = "Service key")),
    responses(
        (status = 200, description = "Product deactivated", body = StripeProductMap),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found")
    ),
    tag = "Products",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn deactivate_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(service_key): Path<String>,
) -> Result<Json<StripeProductMap>, AppError> {
    let product = ProductService::deactivate_product(&state.db, &service_key).await?;
    Ok(Json(product))
}
