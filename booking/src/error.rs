//! Error types for the booking core.

use serde::Serialize;
use thiserror::Error;
use turnstile_web::AppError;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// A single invalid field in a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as it appears in the request body
    pub field: String,
    /// Human-readable reason the field was rejected
    pub reason: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error taxonomy for the reconciliation core.
///
/// Organized by who can act on the failure: the client, the operator, or
/// nobody (transient upstream trouble worth a retry).
#[derive(Debug, Error)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Client-correctable errors
    // ═══════════════════════════════════════════════════════════
    /// Request failed validation; every offending field is listed.
    #[error("Invalid registration request ({} field(s))", .0.len())]
    Validation(Vec<FieldError>),

    /// Referenced entity does not exist (or the event is inactive).
    #[error("{resource} not found")]
    NotFound {
        /// Resource kind ("Event", "Registration", "Payment")
        resource: &'static str,
        /// Identifier the caller supplied
        id: String,
    },

    /// Not enough seats left for the requested ticket count.
    #[error("Insufficient seats: requested {requested}, available {available}")]
    Capacity {
        /// Tickets requested
        requested: i32,
        /// Seats available at check time
        available: i32,
    },

    /// Requested transition conflicts with the registration's current state
    /// (e.g. refunding a registration that is not `paid`).
    #[error("Registration is {current}; {required} required")]
    InvalidTransition {
        /// Current registration status
        current: crate::types::RegistrationStatus,
        /// Status the operation requires
        required: crate::types::RegistrationStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Security
    // ═══════════════════════════════════════════════════════════
    /// Webhook signature was missing, malformed, stale, or wrong.
    #[error("Webhook signature rejected: {0}")]
    Signature(#[from] crate::gateway::SignatureError),

    // ═══════════════════════════════════════════════════════════
    // Upstream
    // ═══════════════════════════════════════════════════════════
    /// The payment provider API failed or answered nonsense.
    #[error("Payment provider error during {operation}: {message}")]
    Gateway {
        /// Gateway operation that failed ("create_order", "fetch_attempts")
        operation: &'static str,
        /// Provider-side detail, logged but never shown to registrants
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Operator alerts
    // ═══════════════════════════════════════════════════════════
    /// A legitimately-paid registration found no seat left to decrement.
    ///
    /// This is a business-process alert, not an HTTP failure: the payment
    /// is settled with the provider and must stay `succeeded`.
    #[error("Seat decrement failed for paid registration {registration_id}: {requested} requested")]
    InventoryInconsistency {
        /// Registration that is paid but unseated
        registration_id: crate::types::RegistrationId,
        /// Seats that could not be decremented
        requested: i32,
    },

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Confirmation dispatch failed (logged, never propagated to callers).
    #[error("Notification error: {0}")]
    Notification(String),
}

impl BookingError {
    /// Shorthand for a [`BookingError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns `true` if this error is due to invalid client input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Capacity { .. }
                | Self::InvalidTransition { .. }
        )
    }

    /// Returns `true` if a retry by the caller may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway { .. } | Self::Database(_))
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(fields) => AppError::validation(
                "Invalid registration request",
                serde_json::json!(fields),
            ),
            BookingError::NotFound { resource, id } => AppError::not_found(resource, id),
            BookingError::Capacity {
                requested,
                available,
            } => AppError::conflict(format!(
                "Not enough seats: requested {requested}, available {available}"
            )),
            BookingError::InvalidTransition { current, required } => AppError::conflict(format!(
                "Registration is {current}; {required} required"
            )),
            BookingError::Signature(sig) => sig.into(),
            BookingError::Gateway { operation, message } => {
                AppError::bad_gateway("Payment provider unavailable").with_source(anyhow::anyhow!(
                    "gateway {operation} failed: {message}"
                ))
            }
            BookingError::InventoryInconsistency {
                registration_id, ..
            } => {
                // Reaching HTTP with this variant means a caller forgot the
                // alert-and-continue contract; degrade to a logged 500.
                AppError::internal("Inventory reconciliation required").with_source(
                    anyhow::anyhow!("inventory inconsistency for registration {registration_id}"),
                )
            }
            BookingError::Database(message) => AppError::internal("Storage failure")
                .with_source(anyhow::anyhow!("database error: {message}")),
            BookingError::Notification(message) => AppError::internal("Notification failure")
                .with_source(anyhow::anyhow!("notification error: {message}")),
        }
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
