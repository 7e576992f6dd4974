use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        // Slots and booking
        .route("/slots/{doctor_id}", get(handlers::list_open_slots))
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))

        // Patient views
        .route("/dashboard", get(handlers::patient_dashboard))
        .route("/records", get(handlers::patient_records))

        // Single appointment
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).put(handlers::update_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))

        // Moderation
        .route("/{appointment_id}/status", put(handlers::admin_update_status))
        .route("/{appointment_id}/admin-cancel", post(handlers::admin_cancel_appointment))
        .route(
            "/{appointment_id}/record",
            get(handlers::get_record).put(handlers::upsert_record),
        )

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
