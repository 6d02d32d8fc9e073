use axum::{
    body::Body,
    extract::Extension,
    http::{Method, Request, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use modkit::contracts::RestHostModule;
use modkit::ModuleCtxBuilder;
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

use api_ingress::request_id::XRequestId;
use api_ingress::{ApiIngress, ApiIngressConfig};

/// Router as the REST phase would build it: host prepare, module routes, host finalize.
fn test_app(cfg: ApiIngressConfig) -> Router {
    let ingress = ApiIngress::new(cfg);
    let ctx = ModuleCtxBuilder::new().build();

    let router = ingress.rest_prepare(&ctx, Router::new()).unwrap();
    let router = router
        .route("/echo-id", get(echo_request_id))
        .route("/echo-body", post(echo_body));
    ingress.rest_finalize(&ctx, router).unwrap()
}

async fn echo_request_id(
    Extension(XRequestId(request_id)): Extension<XRequestId>,
) -> Json<serde_json::Value> {
    Json(json!({ "request_id": request_id }))
}

async fn echo_body(Json(v): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(v)
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn generates_request_id_when_missing() {
    let response = test_app(ApiIngressConfig::default())
        .oneshot(Request::get("/echo-id").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("x-request-id should be generated");
    assert!(!header.is_empty());

    // Handlers see the same id through the extension
    let json = json_body(response).await;
    assert_eq!(json["request_id"], header);
}

#[tokio::test]
async fn preserves_incoming_request_id() {
    let response = test_app(ApiIngressConfig::default())
        .oneshot(
            Request::get("/echo-id")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
    assert_eq!(json_body(response).await["request_id"], "abc-123");
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let response = test_app(ApiIngressConfig::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn body_limit_rejects_large_payloads() {
    let app = test_app(ApiIngressConfig {
        body_limit_bytes: 32,
        ..ApiIngressConfig::default()
    });

    let small = app
        .clone()
        .oneshot(
            Request::post("/echo-body")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"a":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(small.status(), StatusCode::OK);

    let big = format!(r#"{{"a":"{}"}}"#, "x".repeat(128));
    let large = app
        .oneshot(
            Request::post("/echo-body")
                .header("content-type", "application/json")
                .body(Body::from(big))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(large.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_headers_only_when_enabled() {
    let preflight = || {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/echo-id")
            .header("origin", "http://example.com")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap()
    };

    let enabled = test_app(ApiIngressConfig {
        cors_enabled: true,
        ..ApiIngressConfig::default()
    })
    .oneshot(preflight())
    .await
    .unwrap();
    assert!(enabled
        .headers()
        .contains_key("access-control-allow-origin"));

    let disabled = test_app(ApiIngressConfig::default())
        .oneshot(preflight())
        .await
        .unwrap();
    assert!(!disabled
        .headers()
        .contains_key("access-control-allow-origin"));
}
