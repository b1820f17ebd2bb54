use axum::{
    Router,
    routing::{delete, get},
};

use crate::state::AppState;

use super::controller::{
    add_availability_rule, create_teacher, delete_availability_rule, get_availability,
    get_teacher, list_availability_rules, list_teachers,
};

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route("/{id}", get(get_teacher))
        .route("/{id}/availability", get(get_availability))
        .route(
            "/{id}/availability-rules",
            get(list_availability_rules).post(add_availability_rule),
        )
        .route(
            "/{id}/availability-rules/{rule_id}",
            delete(delete_availability_rule),
        )
}
