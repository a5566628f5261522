//! Operator endpoints.
//!
//! Force-update exists for provider-console reconciliation (an operator
//! confirms an order settled or died when webhooks were lost); it calls
//! the very same engine mutations as the webhook path, never a divergent
//! implementation.

use crate::environment::BookingEnvironment;
use crate::gateway::PaymentGateway;
use crate::handlers::RegistrationView;
use crate::notifier::ConfirmationNotifier;
use crate::reconcile::{FailureOutcome, SuccessOutcome};
use crate::stores::{InventoryStore, PaymentStore, RegistrationStore};
use crate::types::RegistrationId;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_web::{AppError, CorrelationId};
use uuid::Uuid;

/// Target outcome for a forced payment update.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedOutcome {
    /// Mark the payment settled (runs the success mutation)
    Succeeded,
    /// Mark the payment failed (runs the failure mutation)
    Failed,
}

/// Request body for a forced payment update.
#[derive(Debug, Deserialize)]
pub struct ForceUpdateRequest {
    /// Desired terminal outcome
    pub outcome: ForcedOutcome,
    /// Provider payment id, when the operator has it
    #[serde(default)]
    pub provider_payment_id: Option<String>,
    /// Operator note, recorded in the audit payload
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response after a forced payment update.
#[derive(Debug, Serialize)]
pub struct ForceUpdateResponse {
    /// What the engine did: applied or duplicate
    pub result: &'static str,
}

/// Force a payment to a terminal outcome through the engine.
pub async fn force_update<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    correlation_id: CorrelationId,
    Path(provider_order_id): Path<String>,
    Json(request): Json<ForceUpdateRequest>,
) -> Result<Json<ForceUpdateResponse>, AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    let audit = serde_json::json!({
        "annotation": "operator force-update",
        "correlation_id": correlation_id.0,
        "reason": request.reason,
    });

    tracing::warn!(
        correlation_id = %correlation_id.0,
        provider_order_id = %provider_order_id,
        outcome = ?request.outcome,
        "Operator force-update"
    );

    let result = match request.outcome {
        ForcedOutcome::Succeeded => match env
            .apply_success(
                &provider_order_id,
                request.provider_payment_id.as_deref(),
                Some(&audit),
            )
            .await?
        {
            SuccessOutcome::Applied { .. } | SuccessOutcome::AppliedWithoutSeats { .. } => {
                "applied"
            }
            SuccessOutcome::AlreadyProcessed => "duplicate",
        },
        ForcedOutcome::Failed => match env
            .apply_failure(&provider_order_id, Some(&audit), request.reason.as_deref())
            .await?
        {
            FailureOutcome::Applied { .. } => "applied",
            FailureOutcome::AlreadyProcessed => "duplicate",
        },
    };

    Ok(Json(ForceUpdateResponse { result }))
}

/// Administratively refund a paid registration and return its seats.
pub async fn refund_registration<I, R, P, G, N>(
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
    tracing::warn!(
        correlation_id = %correlation_id.0,
        registration_id = %id,
        "Operator refund"
    );

    let snapshot = env
        .refund_registration(RegistrationId::from_uuid(id))
        .await?;
    Ok(Json(RegistrationView::from(snapshot)))
}
