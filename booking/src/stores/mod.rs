//! Storage contracts for the reconciliation core.
//!
//! Three narrow traits over one transactional relational store. All
//! correctness-critical mutations are single conditional statements whose
//! affected-row signal the engine interprets; application code never
//! read-then-writes a guarded column.

pub mod postgres;

use crate::error::Result;
use crate::types::{
    AttendeeDetail, Currency, Event, EventId, Money, Payment, Registration, RegistrationId,
};
use std::future::Future;

/// Outcome of a conditional seat adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatAdjustment {
    /// The conditional update matched; counter moved.
    Applied {
        /// Seats available after the adjustment
        new_available: i32,
    },
    /// The condition failed (insufficient seats, or an increment that
    /// would exceed `seats_total`). Nothing was written.
    Rejected,
}

/// Event inventory access.
///
/// `seats_available` is the only shared mutable resource with contention;
/// it is protected solely by these atomic conditional updates. The
/// primitives have no notion of which registration triggered them, so
/// exactly-once-per-registration is enforced upstream by the payment
/// success claim.
pub trait InventoryStore: Send + Sync {
    /// Load an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn get_event(&self, event_id: EventId) -> impl Future<Output = Result<Option<Event>>> + Send;

    /// Atomically decrement `seats_available` by `count` if enough remain.
    ///
    /// Implemented as a single conditional `UPDATE`, never a read followed
    /// by a write.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn decrement_seats(
        &self,
        event_id: EventId,
        count: i32,
    ) -> impl Future<Output = Result<SeatAdjustment>> + Send;

    /// Atomically return `count` seats, bounded by `seats_total`.
    ///
    /// Used by administrative refund.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn increment_seats(
        &self,
        event_id: EventId,
        count: i32,
    ) -> impl Future<Output = Result<SeatAdjustment>> + Send;
}

/// Fields for a new registration row.
#[derive(Clone, Debug)]
pub struct NewRegistration {
    /// Owning event
    pub event_id: EventId,
    /// Registrant name
    pub name: String,
    /// Registrant email
    pub email: String,
    /// Registrant phone
    pub phone: String,
    /// External roll/member identifier
    pub external_ref: Option<String>,
    /// Number of tickets
    pub tickets: i32,
    /// Per-attendee details
    pub ticket_details: Option<Vec<AttendeeDetail>>,
}

/// Registration persistence.
///
/// Status transitions are guarded conditional updates; each `mark_*`
/// returns whether a row actually moved, and callers treat `false` as
/// "already past that state" rather than an error (monotonic lifecycle).
pub trait RegistrationStore: Send + Sync {
    /// Insert a registration in `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn insert(&self, new: NewRegistration) -> impl Future<Output = Result<Registration>> + Send;

    /// Load a registration by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn get(
        &self,
        id: RegistrationId,
    ) -> impl Future<Output = Result<Option<Registration>>> + Send;

    /// `pending -> payment_initiated`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_payment_initiated(
        &self,
        id: RegistrationId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `{pending, payment_initiated, payment_failed} -> paid`.
    ///
    /// `payment_failed -> paid` is allowed because the provider is
    /// authoritative for settlement and deliveries may arrive out of
    /// order; `paid` and `refunded` never move backwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_paid(&self, id: RegistrationId) -> impl Future<Output = Result<bool>> + Send;

    /// `{pending, payment_initiated} -> payment_failed`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_payment_failed(&self, id: RegistrationId)
    -> impl Future<Output = Result<bool>> + Send;

    /// `paid -> refunded` (administrative).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_refunded(&self, id: RegistrationId) -> impl Future<Output = Result<bool>> + Send;
}

/// Fields for a new payment row.
#[derive(Clone, Debug)]
pub struct NewPayment {
    /// Registration this attempt pays for
    pub registration_id: RegistrationId,
    /// Provider order id returned at creation
    pub provider_order_id: String,
    /// Amount in minor units
    pub amount: Money,
    /// Settlement currency
    pub currency: Currency,
}

/// Outcome of the atomic success claim.
#[derive(Clone, Debug, PartialEq)]
pub enum SuccessClaim {
    /// This caller won the conditional update and owns the follow-up
    /// effects (registration transition, seat decrement, notification).
    Claimed(Payment),
    /// The payment is already `succeeded` (or another attempt for the
    /// same registration already succeeded); perform no further writes.
    AlreadyProcessed,
    /// No payment row carries this provider order id; intake never
    /// completed and the webhook must not create one.
    NotFound,
}

/// Outcome of the failure mark.
#[derive(Clone, Debug, PartialEq)]
pub enum FailureMark {
    /// The payment moved `initiated -> failed`.
    Marked(Payment),
    /// The payment was already settled or failed; no-op.
    AlreadyTerminal,
    /// No payment row carries this provider order id.
    NotFound,
}

/// Payment persistence.
pub trait PaymentStore: Send + Sync {
    /// Insert a payment in `initiated`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn insert(&self, new: NewPayment) -> impl Future<Output = Result<Payment>> + Send;

    /// Load a payment by provider order id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn find_by_order_id(
        &self,
        provider_order_id: &str,
    ) -> impl Future<Output = Result<Option<Payment>>> + Send;

    /// Load the most recent payment attempt for a registration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn find_latest_for_registration(
        &self,
        id: RegistrationId,
    ) -> impl Future<Output = Result<Option<Payment>>> + Send;

    /// Atomically claim success: set `succeeded` if the payment is not
    /// already `succeeded`, recording the provider payment id and raw
    /// payload. First writer wins via the affected-row signal; this is
    /// the primary idempotency guard for the whole core.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn claim_success(
        &self,
        provider_order_id: &str,
        provider_payment_id: Option<&str>,
        raw_event: Option<&serde_json::Value>,
    ) -> impl Future<Output = Result<SuccessClaim>> + Send;

    /// Mark `initiated -> failed`, never overwriting `succeeded`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_failed(
        &self,
        provider_order_id: &str,
        raw_event: Option<&serde_json::Value>,
    ) -> impl Future<Output = Result<FailureMark>> + Send;

    /// Mark `initiated -> authorized` (observed via the poll path).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn mark_authorized(
        &self,
        provider_order_id: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Record an informational provider payload (disputes, downtime
    /// notices) without changing status, registration, or seats.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Database`] on storage failure.
    fn record_informational(
        &self,
        provider_order_id: &str,
        raw_event: &serde_json::Value,
    ) -> impl Future<Output = Result<bool>> + Send;
}
