//! Concurrency integration tests.
//!
//! Race conditions the core is built around: concurrent success mutations
//! for the same order, the last-seat race across registrations, and
//! webhook/poll convergence under interleaving.
//!
//! Run with: `cargo test --test concurrency_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;
use turnstile_booking::BookingEnvironment;
use turnstile_booking::config::EngineSettings;
use turnstile_booking::gateway::{AttemptStatus, PaymentAttempt};
use turnstile_booking::intake::RegistrationRequest;
use turnstile_booking::mocks::{
    MockInventoryStore, MockNotifier, MockPaymentGateway, MockPaymentStore, MockRegistrationStore,
};
use turnstile_booking::reconcile::SuccessOutcome;
use turnstile_booking::stores::{PaymentStore, RegistrationStore};
use turnstile_booking::types::{EventId, PaymentStatus, RegistrationId, RegistrationStatus};

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
            webhook_secret: "whsec_test".to_string(),
            webhook_tolerance: Duration::from_secs(300),
            status_poll_attempts: 3,
            status_poll_delay: Duration::from_millis(10),
        },
    ));
    (env, event_id)
}

async fn registered(env: &TestEnv, event_id: EventId, tickets: i32) -> (RegistrationId, String) {
    let details = (tickets > 1).then(|| {
        (0..tickets)
            .map(|i| turnstile_booking::types::AttendeeDetail {
                name: format!("Attendee {i}"),
                external_ref: None,
                email: None,
            })
            .collect()
    });
    let receipt = env
        .create_registration(RegistrationRequest {
            event_id,
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+14155550100".to_string(),
            external_ref: None,
            tickets,
            ticket_details: details,
        })
        .await
        .expect("intake should succeed");
    (receipt.registration_id, receipt.provider_order_id)
}

#[tokio::test]
async fn test_concurrent_success_mutations_for_one_order() {
    // The critical race: many callers pass "is it succeeded?" before any
    // has written. The conditional claim admits exactly one.
    let (env, event_id) = test_env(10);
    let (_, order_id) = registered(&env, event_id, 2).await;

    let mut handles = Vec::new();
    for _ in 0..32 {
        let env = Arc::clone(&env);
        let order_id = order_id.clone();
        handles.push(tokio::spawn(async move {
            env.apply_success(&order_id, Some("pay_1"), None).await
        }));
    }

    let mut applied = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            SuccessOutcome::Applied { .. } => applied += 1,
            SuccessOutcome::AlreadyProcessed => duplicates += 1,
            SuccessOutcome::AppliedWithoutSeats { .. } => panic!("seats were available"),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(duplicates, 31);
    assert_eq!(env.inventory.seats_available(event_id), Some(8));
}

#[tokio::test]
async fn test_scenario_a_last_seat_race() {
    // seats_total = 1. Two registrations for one ticket each both pass the
    // advisory check and both receive success webhooks "simultaneously".
    let (env, event_id) = test_env(1);
    let (reg_a, order_a) = registered(&env, event_id, 1).await;
    let (reg_b, order_b) = registered(&env, event_id, 1).await;

    let env_a = Arc::clone(&env);
    let env_b = Arc::clone(&env);
    let order_a_task = order_a.clone();
    let order_b_task = order_b.clone();
    let (outcome_a, outcome_b) = tokio::join!(
        tokio::spawn(async move { env_a.apply_success(&order_a_task, Some("pay_a"), None).await }),
        tokio::spawn(async move { env_b.apply_success(&order_b_task, Some("pay_b"), None).await }),
    );
    let outcome_a = outcome_a.unwrap().unwrap();
    let outcome_b = outcome_b.unwrap().unwrap();

    // Exactly one registration got the seat; the loser's decrement was
    // rejected and flagged, not crashed, and its payment stays succeeded
    // (the provider settled it).
    let seated = [outcome_a, outcome_b]
        .iter()
        .filter(|o| matches!(o, SuccessOutcome::Applied { .. }))
        .count();
    let unseated = [outcome_a, outcome_b]
        .iter()
        .filter(|o| matches!(o, SuccessOutcome::AppliedWithoutSeats { .. }))
        .count();
    assert_eq!(seated, 1);
    assert_eq!(unseated, 1);
    assert_eq!(env.inventory.seats_available(event_id), Some(0));

    for (registration_id, order_id) in [(reg_a, &order_a), (reg_b, &order_b)] {
        let payment = env.payments.find_by_order_id(order_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        let registration = env.registrations.get(registration_id).await.unwrap().unwrap();
        assert_eq!(registration.status, RegistrationStatus::Paid);
    }
}

#[tokio::test]
async fn test_p1_no_oversell_under_load() {
    // 8 seats, 12 registrations of 1-2 tickets, all settled concurrently.
    // The sum of seated tickets never exceeds capacity and the counter
    // never goes negative.
    let seats_total = 8;
    let (env, event_id) = test_env(seats_total);

    let mut orders = Vec::new();
    for i in 0..12 {
        let tickets = 1 + (i % 2);
        orders.push((tickets, registered(&env, event_id, tickets).await));
    }

    let mut handles = Vec::new();
    for (tickets, (_, order_id)) in orders {
        let env = Arc::clone(&env);
        handles.push(tokio::spawn(async move {
            let outcome = env
                .apply_success(&order_id, Some("pay_x"), None)
                .await
                .unwrap();
            (tickets, outcome)
        }));
    }

    let mut seated_tickets = 0;
    for handle in handles {
        let (tickets, outcome) = handle.await.unwrap();
        if matches!(outcome, SuccessOutcome::Applied { .. }) {
            seated_tickets += tickets;
        }
    }

    let remaining = env.inventory.seats_available(event_id).unwrap();
    assert!(remaining >= 0);
    assert_eq!(seated_tickets + remaining, seats_total);
    assert!(seated_tickets <= seats_total);
}

#[tokio::test]
async fn test_concurrent_webhook_and_poll_converge() {
    // Webhook delivery races the client's verify/poll; both funnel into
    // the same idempotent mutation, so exactly one set of effects lands.
    let (env, event_id) = test_env(4);
    let (registration_id, order_id) = registered(&env, event_id, 2).await;

    env.gateway.set_attempts(
        &order_id,
        vec![PaymentAttempt {
            provider_payment_id: "pay_9".to_string(),
            status: AttemptStatus::Captured,
            failure_reason: None,
        }],
    );

    let webhook_env = Arc::clone(&env);
    let poll_env = Arc::clone(&env);
    let webhook_order = order_id.clone();
    let (webhook, poll) = tokio::join!(
        tokio::spawn(async move {
            webhook_env
                .apply_success(&webhook_order, Some("pay_9"), None)
                .await
        }),
        tokio::spawn(async move { poll_env.verify_registration(registration_id).await }),
    );
    webhook.unwrap().unwrap();
    let snapshot = poll.unwrap().unwrap();

    assert_eq!(snapshot.registration.status, RegistrationStatus::Paid);
    assert_eq!(env.inventory.seats_available(event_id), Some(2));

    // One notification for the one transition.
    for _ in 0..100 {
        if env.notifier.sent_count() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(env.notifier.sent_count(), 1);
}
