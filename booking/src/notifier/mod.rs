//! Confirmation notifier.
//!
//! Outbound email to registrants, decoupled from the reconciliation
//! transaction: the engine spawns dispatch as a background task with its
//! own retry, and a delivery failure is logged, never propagated, and
//! never rolls back a committed state transition.

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::SmtpNotifier;

use crate::error::Result;
use crate::types::{Currency, Money, RegistrationId};
use std::future::Future;

/// Everything a confirmation email needs to render.
#[derive(Clone, Debug, PartialEq)]
pub struct Confirmation {
    /// Recipient email address
    pub recipient: String,
    /// Recipient display name
    pub recipient_name: String,
    /// Confirmed registration
    pub registration_id: RegistrationId,
    /// Event title for the subject/body
    pub event_title: String,
    /// Ticket count
    pub tickets: i32,
    /// Amount paid, minor units
    pub amount: Money,
    /// Settlement currency
    pub currency: Currency,
    /// Provider payment id for the receipt line
    pub provider_payment_id: Option<String>,
}

/// Confirmation email dispatch.
///
/// Implementations must be safe to call from a spawned task; the engine
/// never awaits delivery on the webhook response path.
pub trait ConfirmationNotifier: Send + Sync {
    /// Send a payment confirmation to the registrant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Notification`] if delivery
    /// fails; callers log and retry, they do not propagate.
    fn send_confirmation(
        &self,
        confirmation: &Confirmation,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Runtime-selected notifier (SMTP when configured, console otherwise).
#[derive(Clone)]
pub enum AnyNotifier {
    /// Real SMTP delivery via lettre
    Smtp(SmtpNotifier),
    /// Log-only delivery for development
    Console(ConsoleNotifier),
}

impl ConfirmationNotifier for AnyNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<()> {
        match self {
            Self::Smtp(notifier) => notifier.send_confirmation(confirmation).await,
            Self::Console(notifier) => notifier.send_confirmation(confirmation).await,
        }
    }
}
