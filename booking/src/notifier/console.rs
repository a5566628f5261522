//! Console confirmation notifier for development.

use crate::error::Result;
use crate::notifier::{Confirmation, ConfirmationNotifier};

/// Notifier that logs confirmations instead of sending email.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ConfirmationNotifier for ConsoleNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<()> {
        tracing::info!(
            recipient = %confirmation.recipient,
            registration_id = %confirmation.registration_id,
            event = %confirmation.event_title,
            tickets = confirmation.tickets,
            amount = %confirmation.amount,
            currency = %confirmation.currency,
            "Confirmation email (console notifier)"
        );
        Ok(())
    }
}
