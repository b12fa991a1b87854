//! Integration tests for the push relay HTTP surface.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{FakeHub, FakePlatform};
use futures::StreamExt;
use push_relay::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    Bridge, CallPolicy, RetryPolicy,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn create_test_app(hub: FakeHub) -> (Router, Bridge) {
    let bridge = Bridge::new(
        Arc::new(FakePlatform::new()),
        Arc::new(hub),
        CallPolicy::new(Duration::from_secs(5), RetryPolicy::none()),
    );
    let app = create_router_with_rate_limit(
        AppState::new(bridge.clone()),
        RateLimitState::permissive(),
    );
    (app, bridge)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Split an SSE body into `(event, data)` pairs.
fn parse_events(text: &str) -> Vec<(String, Value)> {
    text.split("\n\n")
        .filter_map(|frame| {
            let mut event = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data = serde_json::from_str(payload.trim()).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app(FakeHub::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["consumer_attached"], false);
}

#[tokio::test]
async fn test_unknown_action_rejected() {
    let (app, bridge) = create_test_app(FakeHub::new());

    let response = app
        .oneshot(post_json(
            "/v1/actions/getTags",
            json!({"args": ["hub1", "conn1"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "UNRECOGNIZED_ACTION");
    assert!(bridge.channels().get().is_none());
}

#[tokio::test]
async fn test_invalid_arguments_rejected() {
    let (app, bridge) = create_test_app(FakeHub::new());

    let response = app
        .oneshot(post_json(
            "/v1/actions/registerApplication",
            json!({"args": ["hub1", "conn1", "handler", null, ""]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
    assert_eq!(json["error"], "senderId can't be null or empty");
    assert!(bridge.channels().get().is_none());
}

#[tokio::test]
async fn test_unregister_streams_ack_and_closes() {
    let (app, _) = create_test_app(FakeHub::new());

    let response = app
        .oneshot(post_json(
            "/v1/actions/unregisterApplication",
            json!({"args": ["hub1", "conn1"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let events = parse_events(std::str::from_utf8(&body).unwrap());

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "dispatched");
    assert_eq!(
        events[0].1,
        json!({"action": "unregisterApplication", "status": "completed"})
    );
    assert_eq!(events[1].0, "result");
    assert_eq!(
        events[1].1,
        json!({"status": "OK", "value": null, "keepCallback": false})
    );
}

#[tokio::test]
async fn test_unregister_failure_streams_error() {
    let (app, _) = create_test_app(FakeHub::failing_revoke());

    let response = app
        .oneshot(post_json(
            "/v1/actions/unregisterApplication",
            json!({"args": ["hub1", "conn1"]}),
        ))
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let events = parse_events(std::str::from_utf8(&body).unwrap());

    assert_eq!(
        events[1].1,
        json!({"status": "ERROR", "message": "revocation refused", "keepCallback": false})
    );
}

#[tokio::test]
async fn test_register_then_relay_notification() {
    let (app, bridge) = create_test_app(FakeHub::new());

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/actions/registerApplication",
            json!({"args": ["hub1", "conn1", "handler", null, {"senderID": "sender1"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let mut text = String::new();

    while parse_events(&text).len() < 2 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("registration result should arrive")
            .unwrap()
            .unwrap();
        text.push_str(std::str::from_utf8(&chunk).unwrap());
    }

    let events = parse_events(&text);
    assert_eq!(
        events[0].1,
        json!({"action": "registerApplication", "status": "pending"})
    );
    assert_eq!(
        events[1].1,
        json!({
            "status": "OK",
            "value": {
                "registrationId": "R1",
                "channelUri": "T1",
                "notificationHubPath": "hub1",
                "event": "registerApplication"
            },
            "keepCallback": true
        })
    );
    assert!(bridge.channels().is_attached());

    let response = app
        .oneshot(post_json("/v1/deliveries", json!({"message": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["delivered"], true);

    while parse_events(&text).len() < 3 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("notification should arrive")
            .unwrap()
            .unwrap();
        text.push_str(std::str::from_utf8(&chunk).unwrap());
    }

    assert_eq!(
        parse_events(&text)[2].1,
        json!({"status": "OK", "value": {"message": "hello"}, "keepCallback": true})
    );
}

#[tokio::test]
async fn test_delivery_without_consumer_accepted() {
    let (app, bridge) = create_test_app(FakeHub::new());

    let response = app
        .oneshot(post_json("/v1/deliveries", json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["delivered"], false);
    assert!(bridge.channels().get().is_none());
}

#[tokio::test]
async fn test_quota_is_tracked_per_action() {
    let bridge = Bridge::new(
        Arc::new(FakePlatform::new()),
        Arc::new(FakeHub::new()),
        CallPolicy::default(),
    );
    let app = create_router_with_rate_limit(AppState::new(bridge), RateLimitState::new(1));

    let first = app
        .clone()
        .oneshot(post_json(
            "/v1/actions/unregisterApplication",
            json!({"args": ["hub1"]}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app
        .clone()
        .oneshot(post_json(
            "/v1/actions/unregisterApplication",
            json!({"args": ["hub1"]}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let json = json_body(second).await;
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(json["error"], "Rate limit exceeded for unregisterApplication");

    let other_action = app
        .oneshot(post_json(
            "/v1/actions/registerApplication",
            json!({"args": []}),
        ))
        .await
        .unwrap();
    assert_eq!(other_action.status(), StatusCode::BAD_REQUEST);
}
