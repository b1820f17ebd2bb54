use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_student, get_me, get_my_package_uses, get_my_packages, get_student,
    get_student_bookings, get_student_packages,
};

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student))
        .route("/me", get(get_me))
        .route("/me/packages", get(get_my_packages))
        .route("/me/packages/{package_id}/uses", get(get_my_package_uses))
        .route("/{id}", get(get_student))
        .route("/{id}/packages", get(get_student_packages))
        .route("/{id}/bookings", get(get_student_bookings))
}
