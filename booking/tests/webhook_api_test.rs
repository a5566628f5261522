//! Webhook endpoint HTTP tests.
//!
//! Drives the full axum router with signed payloads: signature acceptance
//! and rejection over raw bytes, the response contract for duplicates,
//! unknown event types, and unknown orders.
//!
//! Run with: `cargo test --test webhook_api_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use turnstile_booking::config::EngineSettings;
use turnstile_booking::gateway::sign_payload;
use turnstile_booking::intake::RegistrationRequest;
use turnstile_booking::mocks::{
    MockInventoryStore, MockNotifier, MockPaymentGateway, MockPaymentStore, MockRegistrationStore,
};
use turnstile_booking::stores::RegistrationStore;
use turnstile_booking::types::{EventId, RegistrationStatus};
use turnstile_booking::{BookingEnvironment, booking_router};

const SECRET: &str = "whsec_test_secret";

type TestEnv = BookingEnvironment<
    MockInventoryStore,
    MockRegistrationStore,
    MockPaymentStore,
    MockPaymentGateway,
    MockNotifier,
>;

fn test_env(seats: i32) -> (Arc<TestEnv>, EventId) {
    let inventory = MockInventoryStore::new();
    let event_id = inventory.add_event(seats, 2_500, 6);
    let env = Arc::new(BookingEnvironment::new(
        inventory,
        MockRegistrationStore::new(),
        MockPaymentStore::new(),
        MockPaymentGateway::new(),
        MockNotifier::new(),
        EngineSettings {
            webhook_secret: SECRET.to_string(),
            webhook_tolerance: Duration::from_secs(300),
            status_poll_attempts: 3,
            status_poll_delay: Duration::from_millis(10),
        },
    ));
    (env, event_id)
}

async fn registered(env: &TestEnv, event_id: EventId) -> (String, uuid::Uuid) {
    let receipt = env
        .create_registration(RegistrationRequest {
            event_id,
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+14155550100".to_string(),
            external_ref: None,
            tickets: 1,
            ticket_details: None,
        })
        .await
        .expect("intake should succeed");
    (
        receipt.provider_order_id,
        *receipt.registration_id.as_uuid(),
    )
}

fn signature_headers(body: &[u8]) -> [(HeaderName, HeaderValue); 2] {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign_payload(body, &timestamp, SECRET);
    [
        (
            HeaderName::from_static("x-webhook-signature"),
            HeaderValue::from_str(&signature).unwrap(),
        ),
        (
            HeaderName::from_static("x-webhook-timestamp"),
            HeaderValue::from_str(&timestamp).unwrap(),
        ),
    ]
}

fn success_body(order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event": "payment.captured",
        "payload": { "order_id": order_id, "payment_id": "pay_http_1" }
    }))
    .unwrap()
}

async fn post_webhook(
    server: &TestServer,
    body: Vec<u8>,
    headers: &[(HeaderName, HeaderValue)],
) -> axum_test::TestResponse {
    let mut request = server.post("/webhooks/payment");
    for (name, value) in headers {
        request = request.add_header(name.clone(), value.clone());
    }
    request.bytes(body.into()).await
}

#[tokio::test]
async fn test_signed_success_webhook_processes_payment() {
    let (env, event_id) = test_env(5);
    let (order_id, registration_id) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = success_body(&order_id);
    let headers = signature_headers(&body);
    let response = post_webhook(&server, body, &headers).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["status"], "processed");

    let registration = env
        .registrations
        .get(turnstile_booking::types::RegistrationId::from_uuid(
            registration_id,
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registration.status, RegistrationStatus::Paid);
    assert_eq!(env.inventory.seats_available(event_id), Some(4));
}

#[tokio::test]
async fn test_redelivered_webhook_acknowledged_without_writes() {
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = success_body(&order_id);
    let headers = signature_headers(&body);

    let first = post_webhook(&server, body.clone(), &headers).await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = post_webhook(&server, body, &headers).await;
    assert_eq!(second.status_code(), StatusCode::OK);
    let ack: serde_json::Value = second.json();
    assert_eq!(ack["status"], "duplicate");

    assert_eq!(env.inventory.seats_available(event_id), Some(4));
}

#[tokio::test]
async fn test_p5_signature_over_reserialized_bytes_rejected() {
    // Structurally identical JSON whose raw bytes differ from the signed
    // material (re-serialization with whitespace) must be rejected and
    // never processed.
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let signed_bytes = success_body(&order_id);
    let headers = signature_headers(&signed_bytes);

    let delivered = format!(
        "{{ \"event\": \"payment.captured\", \"payload\": {{ \"order_id\": \"{order_id}\", \"payment_id\": \"pay_http_1\" }} }}"
    )
    .into_bytes();
    assert_ne!(signed_bytes, delivered);

    let response = post_webhook(&server, delivered, &headers).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    // Nothing was processed.
    assert_eq!(env.inventory.seats_available(event_id), Some(5));
}

#[tokio::test]
async fn test_missing_signature_header_is_bad_request() {
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = success_body(&order_id);
    let headers = signature_headers(&body);

    // Only the timestamp header, no signature.
    let response = post_webhook(&server, body, &headers[1..]).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stale_timestamp_is_unauthorized() {
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = success_body(&order_id);
    let timestamp = (chrono::Utc::now().timestamp() - 3_600).to_string();
    let signature = sign_payload(&body, &timestamp, SECRET);
    let headers = [
        (
            HeaderName::from_static("x-webhook-signature"),
            HeaderValue::from_str(&signature).unwrap(),
        ),
        (
            HeaderName::from_static("x-webhook-timestamp"),
            HeaderValue::from_str(&timestamp).unwrap(),
        ),
    ];

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged() {
    // Unknown types get 200 "ignored" so the provider stops retrying.
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = serde_json::to_vec(&serde_json::json!({
        "event": "some.future.event",
        "payload": { "order_id": order_id }
    }))
    .unwrap();
    let headers = signature_headers(&body);

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["status"], "ignored");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let (env, _) = test_env(5);
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = success_body("order_never_created");
    let headers = signature_headers(&body);

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failure_webhook_marks_registration_failed() {
    let (env, event_id) = test_env(5);
    let (order_id, registration_id) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = serde_json::to_vec(&serde_json::json!({
        "event": "payment.failed",
        "payload": { "order_id": order_id, "reason": "card_declined" }
    }))
    .unwrap();
    let headers = signature_headers(&body);

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let registration = env
        .registrations
        .get(turnstile_booking::types::RegistrationId::from_uuid(
            registration_id,
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registration.status, RegistrationStatus::PaymentFailed);
    assert_eq!(env.inventory.seats_available(event_id), Some(5));
}

#[tokio::test]
async fn test_informational_webhook_is_recorded() {
    let (env, event_id) = test_env(5);
    let (order_id, _) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = serde_json::to_vec(&serde_json::json!({
        "event": "dispute.created",
        "payload": { "order_id": order_id }
    }))
    .unwrap();
    let headers = signature_headers(&body);

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["status"], "recorded");
}

#[tokio::test]
async fn test_valid_signature_over_garbage_body_is_bad_request() {
    let (env, _) = test_env(5);
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let body = b"not json at all".to_vec();
    let headers = signature_headers(&body);

    let response = post_webhook(&server, body, &headers).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_endpoint_reflects_webhook_outcome() {
    let (env, event_id) = test_env(5);
    let (order_id, registration_id) = registered(&env, event_id).await;
    let server = TestServer::new(booking_router(Arc::clone(&env))).unwrap();

    let pending: serde_json::Value = server
        .get(&format!("/api/registrations/{registration_id}"))
        .await
        .json();
    assert_eq!(pending["status"], "payment_initiated");

    let body = success_body(&order_id);
    let headers = signature_headers(&body);
    post_webhook(&server, body, &headers).await;

    let paid: serde_json::Value = server
        .get(&format!("/api/registrations/{registration_id}"))
        .await
        .json();
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["payment"]["status"], "succeeded");
}
