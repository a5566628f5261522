//! Registration intake integration tests.
//!
//! Drives the intake service against the in-memory providers: validation,
//! capacity, gateway failure, and the happy path.
//!
//! Run with: `cargo test --test intake_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;
use turnstile_booking::BookingEnvironment;
use turnstile_booking::config::EngineSettings;
use turnstile_booking::error::BookingError;
use turnstile_booking::intake::RegistrationRequest;
use turnstile_booking::stores::{PaymentStore, RegistrationStore};
use turnstile_booking::mocks::{
    MockInventoryStore, MockNotifier, MockPaymentGateway, MockPaymentStore, MockRegistrationStore,
};
use turnstile_booking::types::{AttendeeDetail, EventId, RegistrationStatus};

type TestEnv = BookingEnvironment<
    MockInventoryStore,
    MockRegistrationStore,
    MockPaymentStore,
    MockPaymentGateway,
    MockNotifier,
>;

fn test_settings() -> EngineSettings {
    EngineSettings {
        webhook_secret: "whsec_test".to_string(),
        webhook_tolerance: Duration::from_secs(300),
        status_poll_attempts: 3,
        status_poll_delay: Duration::from_millis(10),
    }
}

fn test_env(seats: i32, price_minor: i64) -> (Arc<TestEnv>, EventId) {
    let inventory = MockInventoryStore::new();
    let event_id = inventory.add_event(seats, price_minor, 6);
    let env = Arc::new(BookingEnvironment::new(
        inventory,
        MockRegistrationStore::new(),
        MockPaymentStore::new(),
        MockPaymentGateway::new(),
        MockNotifier::new(),
        test_settings(),
    ));
    (env, event_id)
}

fn request_for(event_id: EventId, tickets: i32) -> RegistrationRequest {
    RegistrationRequest {
        event_id,
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+14155550100".to_string(),
        external_ref: Some("ROLL-42".to_string()),
        tickets,
        ticket_details: None,
    }
}

#[tokio::test]
async fn test_happy_path_creates_order_and_initiates_payment() {
    let (env, event_id) = test_env(10, 2_500);

    let receipt = env
        .create_registration(request_for(event_id, 2).with_details(2))
        .await
        .expect("intake should succeed");

    assert_eq!(receipt.amount.minor_units(), 5_000);
    assert_eq!(receipt.currency.as_str(), "USD");
    assert!(receipt.provider_order_id.starts_with("order_mock_"));
    assert!(!receipt.provider_session_token.is_empty());

    // Registration advanced to payment_initiated, payment row in initiated.
    let registration = env
        .registrations
        .get(receipt.registration_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registration.status, RegistrationStatus::PaymentInitiated);

    let payment = env
        .payments
        .find_by_order_id(&receipt.provider_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.registration_id, receipt.registration_id);
    assert_eq!(payment.amount.minor_units(), 5_000);

    // No seat reserved during checkout.
    assert_eq!(env.inventory.seats_available(event_id), Some(10));

    // Receipt is derived from registration id + creation timestamp.
    let orders = env.gateway.orders_created();
    assert_eq!(orders.len(), 1);
    assert!(
        orders[0]
            .receipt
            .starts_with(&format!("reg-{}-", receipt.registration_id))
    );
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let (env, _) = test_env(10, 2_500);

    let result = env
        .create_registration(request_for(EventId::new(), 1))
        .await;
    assert!(matches!(result, Err(BookingError::NotFound { .. })));
}

#[tokio::test]
async fn test_inactive_event_is_not_found() {
    let (env, event_id) = test_env(10, 2_500);
    env.inventory.deactivate(event_id);

    let result = env.create_registration(request_for(event_id, 1)).await;
    assert!(matches!(result, Err(BookingError::NotFound { .. })));
}

#[tokio::test]
async fn test_insufficient_seats_is_capacity_error() {
    let (env, event_id) = test_env(1, 2_500);

    let result = env
        .create_registration(request_for(event_id, 2).with_details(2))
        .await;
    assert!(matches!(
        result,
        Err(BookingError::Capacity {
            requested: 2,
            available: 1
        })
    ));
}

#[tokio::test]
async fn test_ticket_cap_is_validation_error() {
    let (env, event_id) = test_env(100, 2_500);

    let result = env
        .create_registration(request_for(event_id, 7).with_details(7))
        .await;
    let Err(BookingError::Validation(fields)) = result else {
        panic!("expected validation error");
    };
    assert_eq!(fields[0].field, "tickets");
}

#[tokio::test]
async fn test_scenario_d_short_ticket_details_rejected_without_row() {
    // tickets=3 with only 2 detail entries: rejected, no registration row.
    let (env, event_id) = test_env(10, 2_500);

    let mut request = request_for(event_id, 3).with_details(3);
    request
        .ticket_details
        .as_mut()
        .unwrap()
        .pop();

    let result = env.create_registration(request).await;
    let Err(BookingError::Validation(fields)) = result else {
        panic!("expected validation error");
    };
    assert!(fields.iter().any(|f| f.field == "ticket_details"));

    assert!(env.registrations.all().is_empty());
    assert!(env.gateway.orders_created().is_empty());
}

#[tokio::test]
async fn test_validation_lists_every_offending_field() {
    let (env, event_id) = test_env(10, 2_500);

    let request = RegistrationRequest {
        event_id,
        name: String::new(),
        email: "not-an-email".to_string(),
        phone: "123".to_string(),
        external_ref: None,
        tickets: 1,
        ticket_details: None,
    };

    let Err(BookingError::Validation(fields)) = env.create_registration(request).await else {
        panic!("expected validation error");
    };
    let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(names, vec!["name", "email", "phone"]);
}

#[tokio::test]
async fn test_gateway_failure_leaves_registration_pending() {
    let (env, event_id) = test_env(10, 2_500);
    env.gateway.fail_order_creation();

    let result = env.create_registration(request_for(event_id, 1)).await;
    assert!(matches!(result, Err(BookingError::Gateway { .. })));

    // The registration row exists, abandoned in pending, with no payment
    // and no seat held.
    let registrations = env.registrations.all();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].status, RegistrationStatus::Pending);
    assert!(
        env.payments
            .find_latest_for_registration(registrations[0].id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(env.inventory.seats_available(event_id), Some(10));
}

/// Request builder helper for multi-ticket cases.
trait WithDetails {
    fn with_details(self, count: usize) -> Self;
}

impl WithDetails for RegistrationRequest {
    fn with_details(mut self, count: usize) -> Self {
        self.ticket_details = Some(
            (0..count)
                .map(|i| AttendeeDetail {
                    name: format!("Attendee {i}"),
                    external_ref: None,
                    email: None,
                })
                .collect(),
        );
        self
    }
}
