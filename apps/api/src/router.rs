use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use task_queue_cell::router::job_routes;

use crate::state::CellStates;

pub fn create_router(states: CellStates) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", doctor_routes(states.doctors))
        .nest("/appointments", appointment_routes(states.appointments))
        .nest("/jobs", job_routes(states.jobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    use crate::state::build_states;

    async fn app() -> (Router, String) {
        let config = TestConfig::default().to_arc();
        let secret = config.supabase_jwt_secret.clone();
        let states = build_states(config).await.unwrap();
        (create_router(states), secret)
    }

    #[tokio::test]
    async fn liveness_is_public() {
        let (app, _) = app().await;

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Clinic scheduling API is running!");
    }

    #[tokio::test]
    async fn cells_are_nested_behind_auth() {
        let (app, secret) = app().await;

        for uri in ["/doctors", "/appointments", "/jobs/exports"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }

        let token = JwtTestUtils::create_test_token(&TestUser::patient("pat@example.com", 5), &secret, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/appointments/dashboard")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
