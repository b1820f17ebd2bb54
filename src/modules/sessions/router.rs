use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_session, complete_session, create_session, get_session, list_sessions,
};

pub fn init_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{id}", get(get_session))
        .route("/{id}/complete", post(complete_session))
        .route("/{id}/cancel", post(cancel_session))
}
