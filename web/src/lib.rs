//! HTTP plumbing shared by Turnstile handlers.
//!
//! This crate bridges domain errors to HTTP responses and provides the
//! custom extractors handlers need. It deliberately knows nothing about
//! the booking domain itself.

pub mod error;
pub mod extractors;

pub use error::AppError;
pub use extractors::CorrelationId;
