use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put, patch, delete},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, DoctorState};

pub fn doctor_routes(state: Arc<DoctorState>) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        // Directory
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/status", patch(handlers::set_doctor_status))

        // Own availability (doctor)
        .route(
            "/me/availability",
            get(handlers::get_my_availability).put(handlers::upsert_my_availability),
        )
        .route("/me/availability/{window_id}", delete(handlers::delete_my_availability))

        // Availability on behalf of a doctor (admin)
        .route("/{doctor_id}/availability", put(handlers::upsert_doctor_availability))

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
