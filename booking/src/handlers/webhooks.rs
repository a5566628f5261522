//! Provider webhook endpoint.
//!
//! The body is taken as raw bytes and the signature verified over exactly
//! those bytes before any parsing. Responses follow the provider contract:
//! 200 for processed-or-ignored events (including unknown types, to stop
//! retries), 400 for missing/undecodable headers, 401 for signature
//! mismatch, 404 for orders with no matching payment, 500 only where a
//! provider retry is genuinely wanted.

use crate::environment::BookingEnvironment;
use crate::gateway::{PaymentGateway, verify_signature};
use crate::notifier::ConfirmationNotifier;
use crate::reconcile::{FailureOutcome, SuccessOutcome, WebhookClass, classify_event};
use crate::stores::{InventoryStore, PaymentStore, RegistrationStore};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_web::{AppError, CorrelationId};

/// Header carrying the hex HMAC digest.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
/// Header carrying the signed timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";

/// Signed event envelope from the provider.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    /// Provider event-type tag (loosely cased, inconsistently delimited)
    event: String,
    /// Event payload
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    /// Provider order id the event refers to
    #[serde(default)]
    order_id: Option<String>,
    /// Provider payment id, present on settlement events
    #[serde(default)]
    payment_id: Option<String>,
    /// Provider failure reason, present on failure events
    #[serde(default)]
    reason: Option<String>,
}

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// What happened: processed, duplicate, recorded, or ignored
    pub status: &'static str,
}

fn header<'h>(headers: &'h HeaderMap, name: &'static str) -> Result<&'h str, AppError> {
    headers
        .get(name)
        .ok_or_else(|| AppError::bad_request(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::bad_request(format!("malformed {name} header")))
}

/// Handle a signed provider webhook.
pub async fn provider_webhook<I, R, P, G, N>(
    State(env): State<Arc<BookingEnvironment<I, R, P, G, N>>>,
    correlation_id: CorrelationId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), AppError>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    let signature = header(&headers, SIGNATURE_HEADER)?;
    let timestamp = header(&headers, TIMESTAMP_HEADER)?;

    // Verify over the exact raw bytes received, before any parsing.
    verify_signature(
        &body,
        timestamp,
        signature,
        &env.settings.webhook_secret,
        env.settings.webhook_tolerance,
    )?;

    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("body is not valid JSON"))?;
    let envelope: WebhookEnvelope = serde_json::from_value(raw.clone())
        .map_err(|_| AppError::bad_request("body is not a webhook envelope"))?;

    let class = classify_event(&envelope.event);
    tracing::info!(
        correlation_id = %correlation_id.0,
        event_type = %envelope.event,
        class = ?class,
        order_id = envelope.payload.order_id.as_deref().unwrap_or("-"),
        "Webhook received"
    );

    let ack = match class {
        WebhookClass::Success => {
            let order_id = envelope
                .payload
                .order_id
                .as_deref()
                .ok_or_else(|| AppError::bad_request("success event without order_id"))?;
            match env
                .apply_success(order_id, envelope.payload.payment_id.as_deref(), Some(&raw))
                .await?
            {
                SuccessOutcome::Applied { .. } | SuccessOutcome::AppliedWithoutSeats { .. } => {
                    WebhookAck {
                        status: "processed",
                    }
                }
                SuccessOutcome::AlreadyProcessed => WebhookAck {
                    status: "duplicate",
                },
            }
        }
        WebhookClass::Failure | WebhookClass::UserAbandoned => {
            let order_id = envelope
                .payload
                .order_id
                .as_deref()
                .ok_or_else(|| AppError::bad_request("failure event without order_id"))?;
            match env
                .apply_failure(order_id, Some(&raw), envelope.payload.reason.as_deref())
                .await?
            {
                FailureOutcome::Applied { .. } => WebhookAck {
                    status: "processed",
                },
                FailureOutcome::AlreadyProcessed => WebhookAck {
                    status: "duplicate",
                },
            }
        }
        WebhookClass::Informational => {
            if let Some(order_id) = envelope.payload.order_id.as_deref() {
                env.apply_informational(order_id, &raw).await?;
            }
            WebhookAck { status: "recorded" }
        }
        WebhookClass::Unknown => {
            tracing::warn!(
                event_type = %envelope.event,
                "Unknown webhook event type, acknowledged and ignored"
            );
            WebhookAck { status: "ignored" }
        }
    };

    Ok((StatusCode::OK, Json(ack)))
}
