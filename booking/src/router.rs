//! Router composition for the booking service.

use crate::environment::BookingEnvironment;
use crate::gateway::PaymentGateway;
use crate::handlers::{admin, registrations, webhooks};
use crate::notifier::ConfirmationNotifier;
use crate::stores::{InventoryStore, PaymentStore, RegistrationStore};
use axum::{
    Json, Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Liveness check.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the booking router.
///
/// # Routes
///
/// ## Registrations
/// - `POST /api/registrations` - intake
/// - `GET /api/registrations/:id` - status query
/// - `GET /api/registrations/:id/payment` - latest payment attempt
/// - `POST /api/registrations/:id/verify` - client verify/poll
///
/// ## Provider
/// - `POST /webhooks/payment` - signed provider webhook
///
/// ## Operator
/// - `POST /admin/payments/:provider_order_id/force` - forced outcome
/// - `POST /admin/registrations/:id/refund` - refund + seat return
pub fn booking_router<I, R, P, G, N>(env: Arc<BookingEnvironment<I, R, P, G, N>>) -> Router
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    Router::new()
        .route("/health", get(health))
        // Registration intake + status
        .route(
            "/api/registrations",
            post(registrations::create_registration::<I, R, P, G, N>),
        )
        .route(
            "/api/registrations/:id",
            get(registrations::get_registration::<I, R, P, G, N>),
        )
        .route(
            "/api/registrations/:id/payment",
            get(registrations::get_payment::<I, R, P, G, N>),
        )
        .route(
            "/api/registrations/:id/verify",
            post(registrations::verify_registration::<I, R, P, G, N>),
        )
        // Provider webhook (raw body, signature verified in the handler)
        .route(
            "/webhooks/payment",
            post(webhooks::provider_webhook::<I, R, P, G, N>),
        )
        // Operator endpoints
        .route(
            "/admin/payments/:provider_order_id/force",
            post(admin::force_update::<I, R, P, G, N>),
        )
        .route(
            "/admin/registrations/:id/refund",
            post(admin::refund_registration::<I, R, P, G, N>),
        )
        .with_state(env)
}
