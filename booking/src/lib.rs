//! Payment-and-seat reconciliation core for the Turnstile ticketing
//! platform.
//!
//! Takes a registration request, reserves no seats until payment succeeds,
//! creates a payment-provider order, and - via asynchronous provider
//! webhooks or client-initiated polling - durably and idempotently
//! transitions each registration/payment pair into a terminal state while
//! decrementing finite seat inventory exactly once.
//!
//! # Architecture
//!
//! - [`stores`] - storage contracts plus `PostgreSQL` implementations; all
//!   guarded mutations are single conditional statements.
//! - [`gateway`] - outbound provider client and raw-bytes webhook
//!   signature verification.
//! - [`notifier`] - confirmation email, dispatched off the response path.
//! - [`intake`] - registration intake (advisory capacity check, provider
//!   order creation).
//! - [`reconcile`] - the reconciliation engine: the single idempotent
//!   success/failure mutations every entry point shares.
//! - [`handlers`] / [`router`] - the axum surface.
//!
//! Correctness under concurrent webhooks, polls, and retries rests on two
//! database facts: the conditional claim on `payments.status`, and the
//! conditional decrement of `events.seats_available`.

pub mod config;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod intake;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod notifier;
pub mod reconcile;
pub mod retry;
pub mod router;
pub mod stores;
pub mod types;
pub mod validate;

pub use config::BookingConfig;
pub use environment::BookingEnvironment;
pub use error::{BookingError, FieldError, Result};
pub use router::booking_router;
