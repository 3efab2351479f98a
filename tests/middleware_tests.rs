//! Integration tests for the admission middleware stack.
//!
//! These tests drive the full router in-process with `tower::ServiceExt`:
//! no sockets, no containers. Each request carries a synthetic peer address
//! via the `ConnectInfo` extension, exactly what
//! `into_make_service_with_connect_info` would provide in production.
//!
//! Run with: `cargo test --test middleware_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, Response, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use mirrorview_backend::error::ErrorEnvelope;
use mirrorview_backend::limiter::{CounterStore, LimitRule, StoreError, Verdict, parse_rules};
use mirrorview_backend::services::{NoopFeedbackSink, StubFlipGenerator};
use mirrorview_backend::{AppState, Config, build_router};

/// Store stub simulating an unreachable shared backend.
struct FailingStore;

impl CounterStore for FailingStore {
    fn increment_and_check(
        &self,
        _identity: &str,
        _route: &str,
        _rules: &[LimitRule],
        _now: SystemTime,
    ) -> Result<Verdict, StoreError> {
        Err(StoreError::Unavailable("simulated outage".to_string()))
    }
}

fn app(config: Config) -> Router {
    build_router(AppState::new(config))
}

fn app_with_failing_store(config: Config) -> Router {
    let state = AppState::with_services(
        config,
        Arc::new(FailingStore),
        Arc::new(StubFlipGenerator),
        Arc::new(NoopFeedbackSink),
    );
    build_router(state)
}

/// Config with hour-sized windows so tests never straddle a boundary.
fn config_with_generate_limit(rules: &str) -> Config {
    Config {
        rate_limit_generate: parse_rules(rules).unwrap(),
        ..Config::default()
    }
}

fn generate_body() -> String {
    json!({
        "text": "the original post",
        "submission": {
            "id": Uuid::new_v4(),
            "created_at": "2026-02-03T00:00:00Z",
            "input_text": "the original post",
        }
    })
    .to_string()
}

fn post_request(path: &str, peer: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
        .body(body.into())
        .unwrap()
}

fn get_request(path: &str, peer: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
        .body(Body::empty())
        .unwrap()
}

async fn envelope_from(response: Response<Body>) -> ErrorEnvelope {
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json"),
        "error responses must be JSON"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("error body must be the standard envelope")
}

// =============================================================================
// Security headers and request IDs
// =============================================================================

#[tokio::test]
async fn health_carries_security_headers_and_request_id() {
    let app = app(Config::default());

    let response = app
        .oneshot(get_request("/health", "203.0.113.1:40000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    // Report-only CSP by default.
    assert!(headers.contains_key("content-security-policy-report-only"));
    assert!(!headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn csp_enforced_when_report_only_disabled() {
    let app = app(Config {
        csp_report_only: false,
        ..Config::default()
    });

    let response = app
        .oneshot(get_request("/health", "203.0.113.1:40000"))
        .await
        .unwrap();

    let headers = response.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert!(!headers.contains_key("content-security-policy-report-only"));
}

#[tokio::test]
async fn caller_request_id_is_echoed_into_header_and_error_body() {
    let app = app(Config::default());

    let mut request = get_request("/no/such/route", "203.0.113.1:40000");
    request
        .headers_mut()
        .insert("x-request-id", "corr-42".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "corr-42");
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "request_error");
    assert_eq!(envelope.request_id, "corr-42");
}

#[tokio::test]
async fn generated_request_id_is_a_uuid() {
    let app = app(Config::default());

    let response = app
        .oneshot(get_request("/health", "203.0.113.1:40000"))
        .await
        .unwrap();

    let id = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(Uuid::parse_str(id).is_ok());
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn requests_within_limit_succeed_then_deny_with_retry_after() {
    let app = app(config_with_generate_limit("2/hour"));
    let peer = "203.0.113.1:40000";

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_request("/generate_response", peer, generate_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_request("/generate_response", peer, generate_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 3600);

    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "rate_limited");
    assert!(!envelope.request_id.is_empty());
}

#[tokio::test]
async fn distinct_identities_have_independent_quotas() {
    let app = app(config_with_generate_limit("1/hour"));

    for peer in ["203.0.113.1:40000", "203.0.113.2:40000", "[2001:db8::1]:443"] {
        let response = app
            .clone()
            .oneshot(post_request("/generate_response", peer, generate_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "peer {peer} has its own quota");
    }
}

#[tokio::test]
async fn forwarded_identity_used_when_proxy_trusted() {
    let app = app(Config {
        trust_proxy_headers: true,
        ..config_with_generate_limit("1/hour")
    });
    let proxy = "10.0.0.5:443";

    // Two clients behind the same proxy address.
    for client in ["198.51.100.20", "198.51.100.21"] {
        let mut request = post_request("/generate_response", proxy, generate_body());
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The first client's quota is spent.
    let mut request = post_request("/generate_response", proxy, generate_body());
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.20".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forwarded_header_ignored_when_trust_disabled() {
    let app = app(config_with_generate_limit("1/hour"));
    let peer = "203.0.113.1:40000";

    // Spoofed headers must not mint fresh quota.
    for client in ["198.51.100.20", "198.51.100.21"] {
        let mut request = post_request("/generate_response", peer, generate_body());
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();

        if client == "198.51.100.20" {
            assert_eq!(response.status(), StatusCode::OK);
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }
}

#[tokio::test]
async fn health_and_preflight_never_consume_quota() {
    let app = app(config_with_generate_limit("1/hour"));
    let peer = "203.0.113.1:40000";

    for _ in 0..5 {
        let response = app.clone().oneshot(get_request("/health", peer)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/generate_response")
        .header(header::ORIGIN, "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());

    // Full quota still available.
    let response = app
        .oneshot(post_request("/generate_response", peer, generate_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_failure_fails_closed() {
    let app = app_with_failing_store(Config::default());

    let response = app
        .oneshot(post_request(
            "/generate_response",
            "203.0.113.1:40000",
            generate_body(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "rate_limited");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_burst_admits_exactly_the_limit() {
    let app = app(config_with_generate_limit("5/hour"));
    let peer = "203.0.113.1:40000";

    let mut handles = Vec::new();
    for _ in 0..32 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(post_request("/generate_response", peer, generate_body()))
                .await
                .unwrap()
                .status()
        }));
    }

    let mut admitted = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => denied += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(denied, 27);
}

// =============================================================================
// Body size caps
// =============================================================================

#[tokio::test]
async fn oversized_body_is_rejected_with_envelope() {
    let config = Config::default();
    let cap = config.max_request_body_bytes;
    let app = app(config);

    let body = "x".repeat(cap + 1);
    let mut request = post_request("/generate_response", "203.0.113.1:40000", body);
    request.headers_mut().insert(
        header::CONTENT_LENGTH,
        (cap + 1).to_string().parse().unwrap(),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.headers().contains_key("x-request-id"));
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "payload_too_large");
}

#[tokio::test]
async fn body_of_exactly_the_cap_is_not_rejected_for_size() {
    let config = Config::default();
    let cap = config.max_request_body_bytes;
    let app = app(config);

    // Not valid JSON, so it fails parsing, but never with 413.
    let body = "x".repeat(cap);
    let response = app
        .oneshot(post_request(
            "/generate_response",
            "203.0.113.1:40000",
            body,
        ))
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.status().is_client_error());
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "validation_error");
}

// =============================================================================
// Error envelope normalization
// =============================================================================

#[tokio::test]
async fn invalid_vote_value_yields_validation_envelope() {
    let app = app(Config::default());

    let body = json!({
        "submission": {
            "id": Uuid::new_v4(),
            "created_at": "2026-02-03T00:00:00Z",
            "input_text": "hello",
        },
        "vote": "maybe",
        "voted_at": "2026-02-03T00:01:00Z",
    })
    .to_string();

    let response = app
        .oneshot(post_request("/feedback/thumb", "203.0.113.1:40000", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "validation_error");
}

#[tokio::test]
async fn empty_text_yields_validation_envelope_with_field_message() {
    let app = app(Config::default());

    let body = json!({
        "text": "",
        "submission": {
            "id": Uuid::new_v4(),
            "created_at": "2026-02-03T00:00:00Z",
            "input_text": "hello",
        }
    })
    .to_string();

    let response = app
        .oneshot(post_request(
            "/generate_response",
            "203.0.113.1:40000",
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "validation_error");
    assert!(envelope.error.message.contains("text"));
}

#[tokio::test]
async fn unknown_route_yields_request_error_envelope() {
    let app = app(Config::default());

    let response = app
        .oneshot(get_request("/admin", "203.0.113.1:40000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let envelope = envelope_from(response).await;
    assert_eq!(envelope.error.code, "request_error");
    assert!(!envelope.request_id.is_empty());
}

// =============================================================================
// Happy paths through the full stack
// =============================================================================

#[tokio::test]
async fn generate_round_trip_through_full_stack() {
    let app = app(Config::default());

    let response = app
        .oneshot(post_request(
            "/generate_response",
            "203.0.113.1:40000",
            generate_body(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let flip: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(flip["flipped_text"], "the original post");
}

#[tokio::test]
async fn feedback_round_trips_acknowledge() {
    let app = app(Config::default());
    let peer = "203.0.113.1:40000";

    let thumb = json!({
        "submission": {
            "id": Uuid::new_v4(),
            "created_at": "2026-02-03T00:00:00Z",
            "input_text": "hello",
        },
        "vote": "up",
        "voted_at": "2026-02-03T00:01:00Z",
    })
    .to_string();
    let response = app
        .clone()
        .oneshot(post_request("/feedback/thumb", peer, thumb))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let edit = json!({
        "submission": {
            "id": Uuid::new_v4(),
            "created_at": "2026-02-03T00:00:00Z",
            "input_text": "hello",
        },
        "edited_text": "a better rewrite",
        "edited_at": "2026-02-03T00:02:00Z",
    })
    .to_string();
    let response = app
        .oneshot(post_request("/feedback/edit", peer, edit))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
