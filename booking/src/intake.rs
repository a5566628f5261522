//! Registration intake.
//!
//! Accepts a registration request, validates it, persists the registration
//! in `pending`, creates the provider order, persists the payment attempt
//! in `initiated`, and advances the registration to `payment_initiated`.
//!
//! The capacity check here is advisory only: no seat is reserved during
//! the checkout window. Overselling at this stage is possible by design
//! and is resolved at decrement time, where the conditional update is
//! authoritative.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, FieldError, Result};
use crate::gateway::{OrderRequest, PaymentGateway};
use crate::notifier::ConfirmationNotifier;
use crate::stores::{
    InventoryStore, NewPayment, NewRegistration, PaymentStore, RegistrationStore,
};
use crate::types::{AttendeeDetail, Currency, EventId, Money, RegistrationId};
use crate::validate::validate_static;
use serde::Deserialize;

/// A registration request as received from the client.
#[derive(Clone, Debug, Deserialize)]
pub struct RegistrationRequest {
    /// Event to register for
    pub event_id: EventId,
    /// Registrant name
    pub name: String,
    /// Registrant email
    pub email: String,
    /// Registrant phone
    pub phone: String,
    /// External roll/member identifier
    #[serde(default)]
    pub external_ref: Option<String>,
    /// Number of tickets
    pub tickets: i32,
    /// Per-attendee details, required when `tickets > 1`
    #[serde(default)]
    pub ticket_details: Option<Vec<AttendeeDetail>>,
}

/// Everything the client needs to open the hosted checkout.
#[derive(Clone, Debug, PartialEq)]
pub struct IntakeReceipt {
    /// Created registration
    pub registration_id: RegistrationId,
    /// Provider order to pay against
    pub provider_order_id: String,
    /// Token for the provider's hosted checkout page
    pub provider_session_token: String,
    /// Total amount due, minor units
    pub amount: Money,
    /// Settlement currency
    pub currency: Currency,
}

impl<I, R, P, G, N> BookingEnvironment<I, R, P, G, N>
where
    I: InventoryStore + Clone,
    R: RegistrationStore + Clone,
    P: PaymentStore + Clone,
    G: PaymentGateway + Clone,
    N: ConfirmationNotifier + Clone,
{
    /// Create a registration and its provider order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] listing every offending field
    /// - [`BookingError::NotFound`] for a missing or inactive event
    /// - [`BookingError::Capacity`] when the advisory check fails
    /// - [`BookingError::Gateway`] when order creation fails; the
    ///   registration stays `pending` (abandoned, no seat held)
    /// - [`BookingError::Database`] on storage failure
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn create_registration(&self, request: RegistrationRequest) -> Result<IntakeReceipt> {
        let mut errors = validate_static(&request);
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let event = self
            .inventory
            .get_event(request.event_id)
            .await?
            .filter(|event| event.is_active)
            .ok_or_else(|| BookingError::not_found("Event", request.event_id))?;

        if request.tickets > event.max_tickets_per_order {
            errors.push(FieldError::new(
                "tickets",
                format!("at most {} per order", event.max_tickets_per_order),
            ));
            return Err(BookingError::Validation(errors));
        }

        // Advisory only; the authoritative check is the conditional seat
        // decrement at settlement time.
        if event.seats_available < request.tickets {
            return Err(BookingError::Capacity {
                requested: request.tickets,
                available: event.seats_available,
            });
        }

        let registration = self
            .registrations
            .insert(NewRegistration {
                event_id: request.event_id,
                name: request.name,
                email: request.email,
                phone: request.phone,
                external_ref: request.external_ref,
                tickets: request.tickets,
                ticket_details: request.ticket_details,
            })
            .await?;

        let amount = event.price.times(registration.tickets);

        // Receipt derived from the registration id plus its creation
        // timestamp: unique across retries of the same logical request.
        let receipt = format!(
            "reg-{}-{}",
            registration.id,
            registration.created_at.timestamp()
        );

        let order = match self
            .gateway
            .create_order(&OrderRequest {
                receipt,
                amount,
                currency: event.currency.clone(),
                customer_name: registration.name.clone(),
                customer_email: registration.email.clone(),
                customer_phone: registration.phone.clone(),
            })
            .await
        {
            Ok(order) => order,
            Err(error) => {
                // No silent fallback: the registration stays pending with
                // no way to pay and no seat held.
                tracing::warn!(
                    registration_id = %registration.id,
                    error = %error,
                    "Provider order creation failed; registration abandoned in pending"
                );
                return Err(error);
            }
        };

        self.payments
            .insert(NewPayment {
                registration_id: registration.id,
                provider_order_id: order.provider_order_id.clone(),
                amount,
                currency: event.currency.clone(),
            })
            .await?;

        self.registrations
            .mark_payment_initiated(registration.id)
            .await?;

        tracing::info!(
            registration_id = %registration.id,
            provider_order_id = %order.provider_order_id,
            tickets = registration.tickets,
            amount = %amount,
            "Registration intake complete"
        );

        Ok(IntakeReceipt {
            registration_id: registration.id,
            provider_order_id: order.provider_order_id,
            provider_session_token: order.session_token,
            amount,
            currency: event.currency,
        })
    }
}
