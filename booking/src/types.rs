//! Domain types for the booking core.
//!
//! Value objects and entities for events, registrations, and payments.
//! Identifiers are UUID newtypes so an `EventId` can never be passed where
//! a `RegistrationId` is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Creates a new random `RegistrationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RegistrationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random `PaymentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PaymentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in minor units (cents, paise, ...).
///
/// Arithmetic is deliberately minimal; amounts are computed once at intake
/// and carried through unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a ticket count, saturating on overflow.
    #[must_use]
    pub const fn times(&self, count: i32) -> Self {
        Self(self.0.saturating_mul(count as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code (e.g. "USD", "INR").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency code, normalizing to upper case.
    ///
    /// # Errors
    ///
    /// Returns the rejected input if it is not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, String> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(code.to_string())
        }
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Registration lifecycle.
///
/// Transitions are monotonic along
/// `pending -> payment_initiated -> {paid | payment_failed} -> [refunded]`;
/// `paid` and `refunded` are terminal for everything except the
/// administrative refund of a paid registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Created, provider order not yet in place
    Pending,
    /// Provider order created, awaiting settlement
    PaymentInitiated,
    /// Settled; seats decremented
    Paid,
    /// Provider reported failure or abandonment
    PaymentFailed,
    /// Administratively refunded after `Paid`
    Refunded,
}

impl RegistrationStatus {
    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentInitiated => "payment_initiated",
            Self::Paid => "paid",
            Self::PaymentFailed => "payment_failed",
            Self::Refunded => "refunded",
        }
    }

    /// Whether the state never moves backwards (administrative refund of
    /// `Paid` excepted). `PaymentFailed` is deliberately not terminal: an
    /// authoritative late success from the provider supersedes it.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Refunded)
    }
}

impl std::str::FromStr for RegistrationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "payment_initiated" => Ok(Self::PaymentInitiated),
            "paid" => Ok(Self::Paid),
            "payment_failed" => Ok(Self::PaymentFailed),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment attempt lifecycle: `initiated -> {succeeded | failed | authorized}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created with the provider, nothing settled yet
    Initiated,
    /// Provider confirmed capture
    Succeeded,
    /// Provider reported failure or the checkout was abandoned
    Failed,
    /// Authorized but not captured (observed via the poll path)
    Authorized,
}

impl PaymentStatus {
    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Authorized => "authorized",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "authorized" => Ok(Self::Authorized),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string from storage that no variant matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

// ============================================================================
// Entities
// ============================================================================

/// An event with finite seat inventory.
///
/// Admin CRUD lives outside this crate; the reconciliation core only reads
/// events and adjusts `seats_available` through the atomic primitives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Display title
    pub title: String,
    /// Display description
    pub description: Option<String>,
    /// Total capacity, never exceeded by `seats_available`
    pub seats_total: i32,
    /// Seats currently available for sale
    pub seats_available: i32,
    /// Price per ticket, minor units
    pub price: Money,
    /// Settlement currency
    pub currency: Currency,
    /// Whether registrations are accepted
    pub is_active: bool,
    /// Per-order ticket cap
    pub max_tickets_per_order: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Per-attendee detail for multi-ticket registrations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeDetail {
    /// Attendee name
    pub name: String,
    /// External roll/member identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    /// Optional per-attendee email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A registrant's request to attend an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration identifier
    pub id: RegistrationId,
    /// Owning event
    pub event_id: EventId,
    /// Registrant name
    pub name: String,
    /// Registrant email (confirmation recipient)
    pub email: String,
    /// Registrant phone
    pub phone: String,
    /// External roll/member identifier
    pub external_ref: Option<String>,
    /// Number of tickets requested
    pub tickets: i32,
    /// Per-attendee details; length equals `tickets` when `tickets > 1`
    pub ticket_details: Option<Vec<AttendeeDetail>>,
    /// Lifecycle status
    pub status: RegistrationStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// One attempt to pay for a registration via the external provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier
    pub id: PaymentId,
    /// Registration this attempt pays for
    pub registration_id: RegistrationId,
    /// Provider-side order identifier, unique per attempt
    pub provider_order_id: String,
    /// Provider-side payment identifier, assigned on settlement
    pub provider_payment_id: Option<String>,
    /// Amount, minor units
    pub amount: Money,
    /// Settlement currency
    pub currency: Currency,
    /// Lifecycle status
    pub status: PaymentStatus,
    /// Last-seen provider payload, kept for audit and idempotency inspection
    pub raw_event: Option<serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_money_times() {
        let price = Money::from_minor(2_500);
        assert_eq!(price.times(3), Money::from_minor(7_500));
    }

    #[test]
    fn test_currency_normalizes() {
        assert_eq!(Currency::new(" usd ").unwrap().as_str(), "USD");
        assert!(Currency::new("us").is_err());
        assert!(Currency::new("US1").is_err());
    }

    #[test]
    fn test_registration_status_round_trip() {
        for status in [
            RegistrationStatus::Pending,
            RegistrationStatus::PaymentInitiated,
            RegistrationStatus::Paid,
            RegistrationStatus::PaymentFailed,
            RegistrationStatus::Refunded,
        ] {
            assert_eq!(
                RegistrationStatus::from_str(status.as_str()).unwrap(),
                status
            );
        }
        assert!(RegistrationStatus::from_str("nonsense").is_err());
    }

    #[test]
    fn test_payment_status_round_trip() {
        for status in [
            PaymentStatus::Initiated,
            PaymentStatus::Succeeded,
            PaymentStatus::Failed,
            PaymentStatus::Authorized,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RegistrationStatus::Paid.is_terminal());
        assert!(RegistrationStatus::Refunded.is_terminal());
        assert!(!RegistrationStatus::PaymentFailed.is_terminal());
        assert!(!RegistrationStatus::PaymentInitiated.is_terminal());
    }
}
