use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{deactivate_product, get_product, list_products, upsert_product};

pub fn init_products_router() -> Router<AppState> {
    Router::new().route("/", get(list_products)).route(
        "/{service_key}",
        get(get_product)
            .put(upsert_product)
            .delete(deactivate_product),
    )
}
