//! HTTP handlers for the booking endpoints.
//!
//! Handlers are generic over the [`crate::environment::BookingEnvironment`]
//! type parameters and are instantiated by the router. They translate
//! between the wire and the engine; no handler carries reconciliation
//! logic of its own.

pub mod admin;
pub mod registrations;
pub mod webhooks;

use crate::reconcile::StatusSnapshot;
use crate::types::{EventId, PaymentStatus, RegistrationId, RegistrationStatus};
use serde::Serialize;

/// Wire view of a payment attempt.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// Provider order id
    pub provider_order_id: String,
    /// Provider payment id, present after settlement
    pub provider_payment_id: Option<String>,
    /// Payment status
    pub status: PaymentStatus,
    /// Amount in minor units
    pub amount: i64,
    /// Settlement currency
    pub currency: String,
}

/// Wire view of a registration and its latest payment.
#[derive(Debug, Serialize)]
pub struct RegistrationView {
    /// Registration id
    pub registration_id: RegistrationId,
    /// Owning event
    pub event_id: EventId,
    /// Registration status
    pub status: RegistrationStatus,
    /// Ticket count
    pub tickets: i32,
    /// Human-readable state for the success/failure pages; never raw
    /// provider error text
    pub message: String,
    /// Latest payment attempt, if any
    pub payment: Option<PaymentView>,
}

impl From<StatusSnapshot> for RegistrationView {
    fn from(snapshot: StatusSnapshot) -> Self {
        let message = match snapshot.registration.status {
            RegistrationStatus::Pending | RegistrationStatus::PaymentInitiated => {
                "Payment is being processed".to_string()
            }
            RegistrationStatus::Paid => "Registration confirmed".to_string(),
            RegistrationStatus::PaymentFailed => {
                "Payment failed or was cancelled".to_string()
            }
            RegistrationStatus::Refunded => "Registration refunded".to_string(),
        };

        Self {
            registration_id: snapshot.registration.id,
            event_id: snapshot.registration.event_id,
            status: snapshot.registration.status,
            tickets: snapshot.registration.tickets,
            message,
            payment: snapshot.payment.map(|payment| PaymentView {
                provider_order_id: payment.provider_order_id,
                provider_payment_id: payment.provider_payment_id,
                status: payment.status,
                amount: payment.amount.minor_units(),
                currency: payment.currency.as_str().to_string(),
            }),
        }
    }
}
