use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{book_with_credits, cancel_booking, get_booking, list_my_bookings};

pub fn init_bookings_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_bookings).post(book_with_credits))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", post(cancel_booking))
}
