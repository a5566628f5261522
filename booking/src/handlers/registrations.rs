//! Registration intake and status endpoints.
//!
//! - `POST /api/registrations` - create a registration and provider order
//! - `GET /api/registrations/:id` - current registration + payment state
//! - `GET /api/registrations/:id/payment` - latest payment attempt
//! - `POST /api/registrations/:id/verify` - client-driven verify/poll

use crate::environment::BookingEnvironment;
use crate::gateway::PaymentGateway;
use crate::handlers::{PaymentView, RegistrationView};
use crate::intake::RegistrationRequest;
use crate::notifier::ConfirmationNotifier;
use crate::stores::{InventoryStore, PaymentStore, RegistrationStore};
use crate::types::RegistrationId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use turnstile_web::{AppError, CorrelationId};
use uuid::Uuid;

/// Response after creating a registration.
#[derive(Debug, Serialize)]
pub struct CreateRegistrationResponse {
    /// Created registration
    pub registration_id: RegistrationId,
    /// Provider order to pay against
    pub provider_order_id: String,
    /// Token for the provider's hosted checkout
    pub session_token: String,
    /// Total amount due, minor units
    pub amount: i64,
    /// Settlement currency
    pub currency: String,
}

/// Create a registration and its provider order.
///
/// No seat is reserved here; the capacity check is advisory and the
/// authoritative decrement happens at settlement.
pub async fn create_registration<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    correlation_id: CorrelationId,
    Json(request): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<CreateRegistrationResponse>), AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    tracing::info!(
        correlation_id = %correlation_id.0,
        event_id = %request.event_id,
        tickets = request.tickets,
        "Registration intake request"
    );

    let receipt = env.create_registration(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRegistrationResponse {
            registration_id: receipt.registration_id,
            provider_order_id: receipt.provider_order_id,
            session_token: receipt.provider_session_token,
            amount: receipt.amount.minor_units(),
            currency: receipt.currency.as_str().to_string(),
        }),
    ))
}

/// Read-only registration + payment lookup.
pub async fn get_registration<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationView>, AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    let snapshot = env.snapshot(RegistrationId::from_uuid(id)).await?;
    Ok(Json(RegistrationView::from(snapshot)))
}

/// Read-only latest payment lookup for a registration.
pub async fn get_payment<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    let snapshot = env.snapshot(RegistrationId::from_uuid(id)).await?;
    let payment = snapshot
        .payment
        .ok_or_else(|| AppError::not_found("Payment", id))?;

    Ok(Json(PaymentView {
        provider_order_id: payment.provider_order_id,
        provider_payment_id: payment.provider_payment_id,
        status: payment.status,
        amount: payment.amount.minor_units(),
        currency: payment.currency.as_str().to_string(),
    }))
}

/// Client-driven verify/poll.
///
/// Mutates only through the engine's idempotent mutations; safe to call
/// concurrently with webhook delivery, any number of times.
pub async fn verify_registration<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    correlation_id: CorrelationId,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationView>, AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    tracing::debug!(
        correlation_id = %correlation_id.0,
        registration_id = %id,
        "Client verify request"
    );

    let snapshot = env
        .verify_registration(RegistrationId::from_uuid(id))
        .await?;
    Ok(Json(RegistrationView::from(snapshot)))
}
