//! Mock registration store.

use crate::error::{BookingError, Result};
use crate::stores::{NewRegistration, RegistrationStore};
use crate::types::{Registration, RegistrationId, RegistrationStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory registration store.
#[derive(Clone, Default)]
pub struct MockRegistrationStore {
    registrations: Arc<Mutex<HashMap<RegistrationId, Registration>>>,
}

impl MockRegistrationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All registrations, ordered by creation time.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn all(&self) -> Vec<Registration> {
        let mut registrations: Vec<Registration> =
            self.registrations.lock().unwrap().values().cloned().collect();
        registrations.sort_by_key(|r| r.created_at);
        registrations
    }

    /// Guarded transition under one lock, like the conditional UPDATE.
    fn transition(
        &self,
        id: RegistrationId,
        from: &[RegistrationStatus],
        to: RegistrationStatus,
    ) -> Result<bool> {
        let mut registrations = self
            .registrations
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;
        match registrations.get_mut(&id) {
            Some(registration) if from.contains(&registration.status) => {
                registration.status = to;
                registration.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl RegistrationStore for MockRegistrationStore {
    async fn insert(&self, new: NewRegistration) -> Result<Registration> {
        let now = Utc::now();
        let registration = Registration {
            id: RegistrationId::new(),
            event_id: new.event_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            external_ref: new.external_ref,
            tickets: new.tickets,
            ticket_details: new.ticket_details,
            status: RegistrationStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.registrations
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let registrations = self
            .registrations
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;
        Ok(registrations.get(&id).cloned())
    }

    async fn mark_payment_initiated(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[RegistrationStatus::Pending],
            RegistrationStatus::PaymentInitiated,
        )
    }

    async fn mark_paid(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[
                RegistrationStatus::Pending,
                RegistrationStatus::PaymentInitiated,
                RegistrationStatus::PaymentFailed,
            ],
            RegistrationStatus::Paid,
        )
    }

    async fn mark_payment_failed(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[
                RegistrationStatus::Pending,
                RegistrationStatus::PaymentInitiated,
            ],
            RegistrationStatus::PaymentFailed,
        )
    }

    async fn mark_refunded(&self, id: RegistrationId) -> Result<bool> {
        self.transition(id, &[RegistrationStatus::Paid], RegistrationStatus::Refunded)
    }
}
