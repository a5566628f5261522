//! Payment provider gateway.
//!
//! A thin client over the third-party payment processor: order creation,
//! payment-status fetch, and webhook signature verification. The trait
//! abstracts the provider so tests and local development run against the
//! in-memory mock.

pub mod rest;
pub mod signature;

pub use rest::RestPaymentGateway;
pub use signature::{SignatureError, sign_payload, verify_signature};

use crate::error::Result;
use crate::types::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Order-creation request passed to the provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderRequest {
    /// Merchant-side receipt, unique per attempt
    pub receipt: String,
    /// Amount in minor units
    pub amount: Money,
    /// Settlement currency
    pub currency: Currency,
    /// Customer display name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Customer phone
    pub customer_phone: String,
}

/// Provider order created for a registration attempt.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedOrder {
    /// Provider-side order identifier
    pub provider_order_id: String,
    /// Token the client uses to open the hosted checkout
    pub session_token: String,
}

/// Status of one payment attempt as reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Attempt registered, nothing charged
    Created,
    /// Funds authorized but not captured
    Authorized,
    /// Funds captured; authoritative success
    Captured,
    /// Attempt failed
    Failed,
    /// Status string this client does not recognize
    #[serde(other)]
    Unknown,
}

impl AttemptStatus {
    /// Whether the attempt is authoritatively settled.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Captured)
    }
}

/// One payment attempt from the provider's order-status listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PaymentAttempt {
    /// Provider-side payment identifier
    pub provider_payment_id: String,
    /// Attempt status
    pub status: AttemptStatus,
    /// Provider failure reason, when failed
    pub failure_reason: Option<String>,
}

/// Payment provider client.
///
/// Both operations fail loudly with [`crate::error::BookingError::Gateway`];
/// a broken gateway must never silently hand out a registration with no way
/// to pay.
pub trait PaymentGateway: Send + Sync {
    /// Create a provider order for a registration attempt.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Gateway`] if the provider call
    /// fails or answers an undecodable body.
    fn create_order(&self, order: &OrderRequest)
    -> impl Future<Output = Result<CreatedOrder>> + Send;

    /// Fetch all payment attempts recorded against a provider order.
    ///
    /// The provider API is eventually consistent right after webhook
    /// delivery; callers retry with a bounded fixed backoff.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BookingError::Gateway`] if the provider call
    /// fails or answers an undecodable body.
    fn fetch_attempts(
        &self,
        provider_order_id: &str,
    ) -> impl Future<Output = Result<Vec<PaymentAttempt>>> + Send;
}
