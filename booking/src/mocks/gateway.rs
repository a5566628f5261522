//! Mock payment gateway.

use crate::error::{BookingError, Result};
use crate::gateway::{CreatedOrder, OrderRequest, PaymentAttempt, PaymentGateway};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct GatewayState {
    orders_created: Vec<OrderRequest>,
    attempts_by_order: HashMap<String, Vec<PaymentAttempt>>,
    fail_create: bool,
    fetch_failures_remaining: u32,
    next_order_number: u64,
}

/// In-memory payment gateway.
///
/// Orders are handed out sequentially; tests script the attempt listing
/// and transient fetch failures to exercise the poll path.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockPaymentGateway {
    /// Create a gateway that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_order` fail from now on.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn fail_order_creation(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    /// Script the attempt listing for an order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn set_attempts(&self, provider_order_id: &str, attempts: Vec<PaymentAttempt>) {
        self.state
            .lock()
            .unwrap()
            .attempts_by_order
            .insert(provider_order_id.to_string(), attempts);
    }

    /// Make the next `n` status fetches fail (eventual consistency).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn fail_next_fetches(&self, n: u32) {
        self.state.lock().unwrap().fetch_failures_remaining = n;
    }

    /// Orders created so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn orders_created(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().orders_created.clone()
    }
}

impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;

        if state.fail_create {
            return Err(BookingError::Gateway {
                operation: "create_order",
                message: "mock gateway down".to_string(),
            });
        }

        state.next_order_number += 1;
        let provider_order_id = format!("order_mock_{}", state.next_order_number);
        state.orders_created.push(order.clone());

        Ok(CreatedOrder {
            session_token: format!("session_{provider_order_id}"),
            provider_order_id,
        })
    }

    async fn fetch_attempts(&self, provider_order_id: &str) -> Result<Vec<PaymentAttempt>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;

        if state.fetch_failures_remaining > 0 {
            state.fetch_failures_remaining -= 1;
            return Err(BookingError::Gateway {
                operation: "fetch_attempts",
                message: "mock gateway flaking".to_string(),
            });
        }

        Ok(state
            .attempts_by_order
            .get(provider_order_id)
            .cloned()
            .unwrap_or_default())
    }
}
