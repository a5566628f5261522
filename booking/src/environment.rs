//! Booking environment.
//!
//! This module defines the environment type for dependency injection:
//! every external collaborator the intake service and reconciliation
//! engine touch, behind the provider traits, plus the runtime settings
//! the engine reads.

use crate::config::EngineSettings;
use crate::gateway::PaymentGateway;
use crate::notifier::ConfirmationNotifier;
use crate::stores::{InventoryStore, PaymentStore, RegistrationStore};

/// Booking environment.
///
/// Contains all external dependencies needed by the intake service and the
/// reconciliation engine.
///
/// # Type Parameters
///
/// - `I`: Inventory store
/// - `R`: Registration store
/// - `P`: Payment store
/// - `G`: Payment gateway
/// - `N`: Confirmation notifier
#[derive(Clone)]
pub struct BookingEnvironment<I, R, P, G, N>
where
    I: InventoryStore + Clone,
    R: RegistrationStore + Clone,
    P: PaymentStore + Clone,
    G: PaymentGateway + Clone,
    N: ConfirmationNotifier + Clone,
{
    /// Event inventory (`PostgreSQL`).
    pub inventory: I,

    /// Registration persistence (`PostgreSQL`).
    pub registrations: R,

    /// Payment persistence (`PostgreSQL`).
    pub payments: P,

    /// Outbound payment provider client.
    pub gateway: G,

    /// Confirmation email dispatch.
    pub notifier: N,

    /// Engine runtime settings (webhook secret, poll budget).
    pub settings: EngineSettings,
}

impl<I, R, P, G, N> BookingEnvironment<I, R, P, G, N>
where
    I: InventoryStore + Clone,
    R: RegistrationStore + Clone,
    P: PaymentStore + Clone,
    G: PaymentGateway + Clone,
    N: ConfirmationNotifier + Clone,
{
    /// Create a new booking environment.
    #[must_use]
    pub const fn new(
        inventory: I,
        registrations: R,
        payments: P,
        gateway: G,
        notifier: N,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inventory,
            registrations,
            payments,
            gateway,
            notifier,
            settings,
        }
    }
}
