use std::sync::Arc;
use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::auth_middleware;
use crate::handlers::{enqueue_job, get_job, request_export, JobState};

pub fn job_routes(state: Arc<JobState>) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        .route("/", post(enqueue_job))
        .route("/exports", post(request_export))
        .route("/{job_id}", get(get_job))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
