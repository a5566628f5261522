//! Reconciliation engine.
//!
//! The single source of truth for the paid/failed transition. Every entry
//! point (provider webhook, client verify/poll, admin force-update)
//! calls through [`BookingEnvironment::apply_success`] and
//! [`BookingEnvironment::apply_failure`]; there is deliberately no second
//! implementation of these steps anywhere in the crate.
//!
//! Idempotency and race safety come entirely from the payment store's
//! conditional success claim: only the caller whose `UPDATE` matched a row
//! proceeds to the registration transition, the seat decrement, and the
//! notification. Every other caller observes `AlreadyProcessed` and
//! performs no writes.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::gateway::{AttemptStatus, PaymentGateway};
use crate::notifier::{Confirmation, ConfirmationNotifier};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::stores::{
    FailureMark, InventoryStore, PaymentStore, RegistrationStore, SeatAdjustment, SuccessClaim,
};
use crate::types::{Payment, Registration, RegistrationId};

/// Logical class of a provider webhook event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookClass {
    /// Payment settled; run the success mutation.
    Success,
    /// Payment failed; run the failure mutation.
    Failure,
    /// Registrant walked away from checkout; run the failure mutation.
    UserAbandoned,
    /// Disputes, downtime, authorization notices: recorded, no state change.
    Informational,
    /// Not in the known set: acknowledged and logged, never an error.
    Unknown,
}

/// Normalize a provider event-type string into a [`WebhookClass`].
///
/// Provider tags are loosely cased and inconsistently delimited; the
/// mapping is total, with everything unrecognized landing in
/// [`WebhookClass::Unknown`] so the provider is never made to retry events
/// this system intentionally does not act on.
#[must_use]
pub fn classify_event(event_type: &str) -> WebhookClass {
    let normalized = event_type.trim().to_lowercase().replace([' ', '_'], ".");

    match normalized.as_str() {
        "payment.captured" | "payment.success" | "order.paid" | "charge.succeeded" => {
            WebhookClass::Success
        }
        "payment.failed" | "payment.failure" | "charge.failed" => WebhookClass::Failure,
        "checkout.abandoned" | "payment.cancelled" | "payment.canceled" | "order.expired" => {
            WebhookClass::UserAbandoned
        }
        "payment.authorized"
        | "dispute.created"
        | "dispute.closed"
        | "dispute.under.review"
        | "downtime.started"
        | "downtime.resolved"
        | "qr.activated"
        | "qr.closed" => WebhookClass::Informational,
        _ => WebhookClass::Unknown,
    }
}

/// Outcome of the idempotent success mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuccessOutcome {
    /// This call performed the transition and the seat decrement.
    Applied {
        /// Registration that moved to `paid`
        registration_id: RegistrationId,
        /// Seats remaining after the decrement
        seats_remaining: i32,
    },
    /// The transition was performed but the seat decrement found the
    /// inventory exhausted; an operator alert was raised and the payment
    /// remains `succeeded` (it is legitimately settled).
    AppliedWithoutSeats {
        /// Registration that moved to `paid` without a seat
        registration_id: RegistrationId,
    },
    /// A previous call already performed the transition; no writes done.
    AlreadyProcessed,
}

/// Outcome of the failure mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Payment and registration moved to their failed states.
    Applied {
        /// Registration that moved to `payment_failed`
        registration_id: RegistrationId,
    },
    /// The payment was already terminal; no writes done.
    AlreadyProcessed,
}

/// Current persisted state of a registration and its latest payment.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    /// The registration
    pub registration: Registration,
    /// Latest payment attempt, if intake got that far
    pub payment: Option<Payment>,
}

impl<I, R, P, G, N> BookingEnvironment<I, R, P, G, N>
where
    I: InventoryStore + Clone + 'static,
    R: RegistrationStore + Clone + 'static,
    P: PaymentStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
    N: ConfirmationNotifier + Clone + 'static,
{
    /// The idempotent success mutation.
    ///
    /// Safe under arbitrary repetition and concurrent execution: the
    /// conditional claim on the payment row decides a single winner, and
    /// only the winner touches the registration, the seat counter, and
    /// the notifier.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] when no payment carries this provider
    ///   order id (intake never completed; the webhook must not create one)
    /// - [`BookingError::Database`] on storage failure
    #[tracing::instrument(skip(self, raw_event))]
    pub async fn apply_success(
        &self,
        provider_order_id: &str,
        provider_payment_id: Option<&str>,
        raw_event: Option<&serde_json::Value>,
    ) -> Result<SuccessOutcome> {
        let payment = match self
            .payments
            .claim_success(provider_order_id, provider_payment_id, raw_event)
            .await?
        {
            SuccessClaim::NotFound => {
                return Err(BookingError::not_found("Payment", provider_order_id));
            }
            SuccessClaim::AlreadyProcessed => {
                tracing::debug!(provider_order_id, "Success already recorded, no writes");
                return Ok(SuccessOutcome::AlreadyProcessed);
            }
            SuccessClaim::Claimed(payment) => payment,
        };

        let registration = self
            .registrations
            .get(payment.registration_id)
            .await?
            .ok_or_else(|| {
                BookingError::Database(format!(
                    "registration {} missing for claimed payment {}",
                    payment.registration_id, payment.id
                ))
            })?;

        if !self.registrations.mark_paid(registration.id).await? {
            // Terminal already (refunded, or a prior run crashed after the
            // registration write); the claim stands, nothing else to do.
            tracing::warn!(
                registration_id = %registration.id,
                status = %registration.status,
                "Registration did not transition to paid; skipping seat decrement"
            );
            return Ok(SuccessOutcome::AlreadyProcessed);
        }

        match self
            .inventory
            .decrement_seats(registration.event_id, registration.tickets)
            .await?
        {
            SeatAdjustment::Applied { new_available } => {
                metrics::counter!("booking_reconciliation_success_total").increment(1);
                tracing::info!(
                    registration_id = %registration.id,
                    provider_order_id,
                    tickets = registration.tickets,
                    seats_remaining = new_available,
                    "Registration paid, seats decremented"
                );
                self.spawn_confirmation(registration.clone(), payment);
                Ok(SuccessOutcome::Applied {
                    registration_id: registration.id,
                    seats_remaining: new_available,
                })
            }
            SeatAdjustment::Rejected => {
                // A paid registration with no seat left: business alert,
                // never an HTTP failure. The payment is settled with the
                // provider and stays succeeded.
                let alert = BookingError::InventoryInconsistency {
                    registration_id: registration.id,
                    requested: registration.tickets,
                };
                metrics::counter!("booking_inventory_inconsistency_total").increment(1);
                tracing::error!(
                    registration_id = %registration.id,
                    event_id = %registration.event_id,
                    tickets = registration.tickets,
                    alert = %alert,
                    "Inventory inconsistency: paid registration exceeds capacity"
                );
                Ok(SuccessOutcome::AppliedWithoutSeats {
                    registration_id: registration.id,
                })
            }
        }
    }

    /// The failure mutation: payment to `failed`, registration to
    /// `payment_failed`. No seat mutation, no notification; repeated
    /// application past the first write is a no-op.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] when no payment carries this provider
    ///   order id
    /// - [`BookingError::Database`] on storage failure
    #[tracing::instrument(skip(self, raw_event))]
    pub async fn apply_failure(
        &self,
        provider_order_id: &str,
        raw_event: Option<&serde_json::Value>,
        reason: Option<&str>,
    ) -> Result<FailureOutcome> {
        let payment = match self.payments.mark_failed(provider_order_id, raw_event).await? {
            FailureMark::NotFound => {
                return Err(BookingError::not_found("Payment", provider_order_id));
            }
            FailureMark::AlreadyTerminal => {
                tracing::debug!(provider_order_id, "Payment already terminal, no writes");
                return Ok(FailureOutcome::AlreadyProcessed);
            }
            FailureMark::Marked(payment) => payment,
        };

        // A false here means the registration is already paid or refunded;
        // terminal states never move backwards.
        let moved = self
            .registrations
            .mark_payment_failed(payment.registration_id)
            .await?;

        metrics::counter!("booking_reconciliation_failure_total").increment(1);
        tracing::info!(
            registration_id = %payment.registration_id,
            provider_order_id,
            registration_moved = moved,
            reason = reason.unwrap_or("unspecified"),
            "Payment failure recorded"
        );

        Ok(FailureOutcome::Applied {
            registration_id: payment.registration_id,
        })
    }

    /// Record an informational provider event (dispute, downtime,
    /// authorization notice) against the payment's audit payload. No
    /// registration or seat change, ever.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Database`] on storage failure.
    pub async fn apply_informational(
        &self,
        provider_order_id: &str,
        raw_event: &serde_json::Value,
    ) -> Result<()> {
        let recorded = self
            .payments
            .record_informational(provider_order_id, raw_event)
            .await?;
        if !recorded {
            tracing::debug!(
                provider_order_id,
                "Informational event for unknown order, dropped"
            );
        }
        Ok(())
    }

    /// Client verify/poll path.
    ///
    /// Re-reads persisted state and, when the registration is still in
    /// flight, polls the provider with a bounded fixed backoff. An
    /// authoritative settled attempt drives the same success mutation as
    /// the webhook path; gateway trouble after the retry budget surfaces
    /// the current persisted state rather than a hard failure, and the
    /// client keeps polling.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown registration
    /// - [`BookingError::Database`] on storage failure
    #[tracing::instrument(skip(self))]
    pub async fn verify_registration(&self, id: RegistrationId) -> Result<StatusSnapshot> {
        let registration = self
            .registrations
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Registration", id))?;

        if registration.status.is_terminal() {
            return self.snapshot(id).await;
        }

        let Some(payment) = self.payments.find_latest_for_registration(id).await? else {
            // Intake never reached order creation; nothing to poll.
            return self.snapshot(id).await;
        };

        let policy = RetryPolicy::fixed(
            self.settings.status_poll_attempts,
            self.settings.status_poll_delay,
        );
        let attempts = match retry_with_backoff(&policy, || {
            self.gateway.fetch_attempts(&payment.provider_order_id)
        })
        .await
        {
            Ok(attempts) => attempts,
            Err(error) => {
                // Surfaced as pending/unknown; the UI path keeps polling.
                tracing::warn!(
                    registration_id = %id,
                    provider_order_id = %payment.provider_order_id,
                    error = %error,
                    "Status poll exhausted retries, reporting persisted state"
                );
                return self.snapshot(id).await;
            }
        };

        if let Some(settled) = attempts.iter().find(|a| a.status.is_settled()) {
            self.apply_success(
                &payment.provider_order_id,
                Some(&settled.provider_payment_id),
                None,
            )
            .await?;
        } else if attempts
            .iter()
            .any(|a| a.status == AttemptStatus::Authorized)
        {
            self.payments
                .mark_authorized(&payment.provider_order_id)
                .await?;
        } else if !attempts.is_empty()
            && attempts.iter().all(|a| a.status == AttemptStatus::Failed)
        {
            let reason = attempts
                .iter()
                .rev()
                .find_map(|a| a.failure_reason.as_deref());
            self.apply_failure(&payment.provider_order_id, None, reason)
                .await?;
        }

        self.snapshot(id).await
    }

    /// Read-only registration + latest payment lookup.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown registration
    /// - [`BookingError::Database`] on storage failure
    pub async fn snapshot(&self, id: RegistrationId) -> Result<StatusSnapshot> {
        let registration = self
            .registrations
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Registration", id))?;
        let payment = self.payments.find_latest_for_registration(id).await?;
        Ok(StatusSnapshot {
            registration,
            payment,
        })
    }

    /// Administrative refund: registration `paid -> refunded`, seats
    /// returned, payment annotated. Money movement at the provider is an
    /// operator concern outside this system.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown registration
    /// - [`BookingError::InvalidTransition`] when the registration is not
    ///   in `paid`
    /// - [`BookingError::Database`] on storage failure
    #[tracing::instrument(skip(self))]
    pub async fn refund_registration(&self, id: RegistrationId) -> Result<StatusSnapshot> {
        let registration = self
            .registrations
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Registration", id))?;

        if !self.registrations.mark_refunded(id).await? {
            return Err(BookingError::InvalidTransition {
                current: registration.status,
                required: crate::types::RegistrationStatus::Paid,
            });
        }

        match self
            .inventory
            .increment_seats(registration.event_id, registration.tickets)
            .await?
        {
            SeatAdjustment::Applied { new_available } => {
                tracing::info!(
                    registration_id = %id,
                    seats_remaining = new_available,
                    "Registration refunded, seats returned"
                );
            }
            SeatAdjustment::Rejected => {
                // Returning seats past seats_total means capacity was
                // reduced after the sale; log and leave the counter alone.
                tracing::warn!(
                    registration_id = %id,
                    "Seat return rejected (would exceed capacity)"
                );
            }
        }

        if let Some(payment) = self.payments.find_latest_for_registration(id).await? {
            self.payments
                .record_informational(
                    &payment.provider_order_id,
                    &serde_json::json!({"annotation": "registration refunded"}),
                )
                .await?;
        }

        self.snapshot(id).await
    }

    /// Dispatch the confirmation email off the response path.
    ///
    /// The spawned task loads the event title, then retries delivery with
    /// its own budget; failure is logged and never reaches the caller.
    fn spawn_confirmation(&self, registration: Registration, payment: Payment) {
        let inventory = self.inventory.clone();
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            let event_title = match inventory.get_event(registration.event_id).await {
                Ok(Some(event)) => event.title,
                Ok(None) | Err(_) => "your event".to_string(),
            };

            let confirmation = Confirmation {
                recipient: registration.email.clone(),
                recipient_name: registration.name.clone(),
                registration_id: registration.id,
                event_title,
                tickets: registration.tickets,
                amount: payment.amount,
                currency: payment.currency.clone(),
                provider_payment_id: payment.provider_payment_id.clone(),
            };

            let policy = RetryPolicy::default();
            if let Err(error) =
                retry_with_backoff(&policy, || notifier.send_confirmation(&confirmation)).await
            {
                tracing::error!(
                    registration_id = %registration.id,
                    recipient = %registration.email,
                    error = %error,
                    "Confirmation email failed after retries"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_variants() {
        assert_eq!(classify_event("payment.captured"), WebhookClass::Success);
        assert_eq!(classify_event("Payment Success"), WebhookClass::Success);
        assert_eq!(classify_event("ORDER.PAID"), WebhookClass::Success);
        assert_eq!(classify_event("payment_success"), WebhookClass::Success);
    }

    #[test]
    fn test_classify_failure_variants() {
        assert_eq!(classify_event("payment.failed"), WebhookClass::Failure);
        assert_eq!(classify_event("Payment Failed"), WebhookClass::Failure);
        assert_eq!(classify_event("charge.failed"), WebhookClass::Failure);
    }

    #[test]
    fn test_classify_abandonment() {
        assert_eq!(
            classify_event("checkout.abandoned"),
            WebhookClass::UserAbandoned
        );
        assert_eq!(
            classify_event("payment.cancelled"),
            WebhookClass::UserAbandoned
        );
    }

    #[test]
    fn test_classify_informational() {
        assert_eq!(
            classify_event("payment.authorized"),
            WebhookClass::Informational
        );
        assert_eq!(
            classify_event("dispute.created"),
            WebhookClass::Informational
        );
        assert_eq!(
            classify_event("downtime.started"),
            WebhookClass::Informational
        );
    }

    #[test]
    fn test_classify_unknown_never_errors() {
        assert_eq!(classify_event("totally.new.event"), WebhookClass::Unknown);
        assert_eq!(classify_event(""), WebhookClass::Unknown);
        assert_eq!(classify_event("   "), WebhookClass::Unknown);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Classification is total: arbitrary provider strings map to a
            // class, and casing/delimiters never change the outcome.
            #[test]
            fn prop_classify_is_total(s in "\\PC*") {
                let _ = classify_event(&s);
            }

            #[test]
            fn prop_classify_is_case_insensitive(s in "[a-z.]{1,30}") {
                prop_assert_eq!(
                    classify_event(&s),
                    classify_event(&s.to_uppercase())
                );
            }
        }
    }
}
