//! Mock payment store.
//!
//! The success claim is a check-and-set under one lock, equivalent to the
//! database's conditional UPDATE plus the partial unique index on
//! succeeded attempts per registration.

use crate::error::{BookingError, Result};
use crate::stores::{FailureMark, NewPayment, PaymentStore, SuccessClaim};
use crate::types::{Payment, PaymentId, PaymentStatus, RegistrationId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory payment store.
#[derive(Clone, Default)]
pub struct MockPaymentStore {
    payments: Arc<Mutex<HashMap<PaymentId, Payment>>>,
}

impl MockPaymentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All payments for a registration, insertion-ordered by creation time.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn payments_for(&self, id: RegistrationId) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.registration_id == id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        payments
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PaymentId, Payment>>> {
        self.payments
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))
    }
}

impl PaymentStore for MockPaymentStore {
    async fn insert(&self, new: NewPayment) -> Result<Payment> {
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(),
            registration_id: new.registration_id,
            provider_order_id: new.provider_order_id,
            provider_payment_id: None,
            amount: new.amount,
            currency: new.currency,
            status: PaymentStatus::Initiated,
            raw_event: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_by_order_id(&self, provider_order_id: &str) -> Result<Option<Payment>> {
        let payments = self.lock()?;
        Ok(payments
            .values()
            .find(|p| p.provider_order_id == provider_order_id)
            .cloned())
    }

    async fn find_latest_for_registration(&self, id: RegistrationId) -> Result<Option<Payment>> {
        let payments = self.lock()?;
        Ok(payments
            .values()
            .filter(|p| p.registration_id == id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn claim_success(
        &self,
        provider_order_id: &str,
        provider_payment_id: Option<&str>,
        raw_event: Option<&serde_json::Value>,
    ) -> Result<SuccessClaim> {
        let mut payments = self.lock()?;

        let Some(target_id) = payments
            .values()
            .find(|p| p.provider_order_id == provider_order_id)
            .map(|p| p.id)
        else {
            return Ok(SuccessClaim::NotFound);
        };

        let registration_id = payments[&target_id].registration_id;

        if payments[&target_id].status == PaymentStatus::Succeeded {
            return Ok(SuccessClaim::AlreadyProcessed);
        }

        // Partial-unique-index emulation: another attempt for the same
        // registration already succeeded.
        if payments
            .values()
            .any(|p| p.registration_id == registration_id && p.status == PaymentStatus::Succeeded)
        {
            return Ok(SuccessClaim::AlreadyProcessed);
        }

        let payment = payments
            .get_mut(&target_id)
            .ok_or_else(|| BookingError::Database("mock payment vanished".into()))?;
        payment.status = PaymentStatus::Succeeded;
        if let Some(pid) = provider_payment_id {
            payment.provider_payment_id = Some(pid.to_string());
        }
        if let Some(raw) = raw_event {
            payment.raw_event = Some(raw.clone());
        }
        payment.updated_at = Utc::now();
        Ok(SuccessClaim::Claimed(payment.clone()))
    }

    async fn mark_failed(
        &self,
        provider_order_id: &str,
        raw_event: Option<&serde_json::Value>,
    ) -> Result<FailureMark> {
        let mut payments = self.lock()?;

        let Some(target_id) = payments
            .values()
            .find(|p| p.provider_order_id == provider_order_id)
            .map(|p| p.id)
        else {
            return Ok(FailureMark::NotFound);
        };

        let payment = payments
            .get_mut(&target_id)
            .ok_or_else(|| BookingError::Database("mock payment vanished".into()))?;

        if !matches!(
            payment.status,
            PaymentStatus::Initiated | PaymentStatus::Authorized
        ) {
            return Ok(FailureMark::AlreadyTerminal);
        }

        payment.status = PaymentStatus::Failed;
        if let Some(raw) = raw_event {
            payment.raw_event = Some(raw.clone());
        }
        payment.updated_at = Utc::now();
        Ok(FailureMark::Marked(payment.clone()))
    }

    async fn mark_authorized(&self, provider_order_id: &str) -> Result<bool> {
        let mut payments = self.lock()?;
        for payment in payments.values_mut() {
            if payment.provider_order_id == provider_order_id
                && payment.status == PaymentStatus::Initiated
            {
                payment.status = PaymentStatus::Authorized;
                payment.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn record_informational(
        &self,
        provider_order_id: &str,
        raw_event: &serde_json::Value,
    ) -> Result<bool> {
        let mut payments = self.lock()?;
        for payment in payments.values_mut() {
            if payment.provider_order_id == provider_order_id {
                payment.raw_event = Some(raw_event.clone());
                payment.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }
}
