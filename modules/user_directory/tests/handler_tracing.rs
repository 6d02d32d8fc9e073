//! Tests to verify that handlers and the service emit the expected tracing output

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use tracing_test::traced_test;

use user_directory::api::rest::routes::register_routes;
use user_directory::domain::service::{Service, ServiceConfig};
use user_directory::infra::storage::memory::InMemoryUsersRepository;

fn router() -> Router {
    let service = Arc::new(Service::new(
        Arc::new(InMemoryUsersRepository::new()),
        ServiceConfig::default(),
    ));
    register_routes(Router::new(), service).unwrap()
}

#[tokio::test]
#[traced_test]
async fn create_handler_logs_request_and_service_span() {
    let resp = router()
        .oneshot(
            Request::post("/users")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"Ann","email":"ann@x.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    assert!(logs_contain("Creating user"));
    assert!(logs_contain("user_directory.service.create_user"));
    assert!(logs_contain("Successfully created user with id=1"));
}

#[tokio::test]
#[traced_test]
async fn failed_lookup_is_logged_as_error() {
    let resp = router()
        .oneshot(Request::get("/users/7").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert!(logs_contain("Getting user with id: 7"));
    assert!(logs_contain("Failed to get user 7"));
}
