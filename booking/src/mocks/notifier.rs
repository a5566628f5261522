//! Mock confirmation notifier.

use crate::error::{BookingError, Result};
use crate::notifier::{Confirmation, ConfirmationNotifier};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct NotifierState {
    sent: Vec<Confirmation>,
    failures_remaining: u32,
}

/// In-memory notifier recording every delivery attempt.
#[derive(Clone, Default)]
pub struct MockNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl MockNotifier {
    /// Create a notifier that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail (exercises the retry budget).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn fail_next_sends(&self, n: u32) {
        self.state.lock().unwrap().failures_remaining = n;
    }

    /// Confirmations delivered so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn sent(&self) -> Vec<Confirmation> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Number of confirmations delivered.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent().len()
    }
}

impl ConfirmationNotifier for MockNotifier {
    async fn send_confirmation(&self, confirmation: &Confirmation) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BookingError::Notification("mock lock poisoned".into()))?;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(BookingError::Notification("mock smtp down".to_string()));
        }

        state.sent.push(confirmation.clone());
        Ok(())
    }
}
