//! Mock inventory store.

use crate::error::{BookingError, Result};
use crate::stores::{InventoryStore, SeatAdjustment};
use crate::types::{Currency, Event, EventId, Money};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory inventory store.
///
/// Clones share state, matching a shared connection pool.
#[derive(Clone, Default)]
pub struct MockInventoryStore {
    events: Arc<Mutex<HashMap<EventId, Event>>>,
}

impl MockInventoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn add_event(&self, seats: i32, price_minor: i64, max_per_order: i32) -> EventId {
        let id = EventId::new();
        let now = Utc::now();
        let event = Event {
            id,
            title: "Test Event".to_string(),
            description: None,
            seats_total: seats,
            seats_available: seats,
            price: Money::from_minor(price_minor),
            currency: Currency::new("USD").unwrap(),
            is_active: true,
            max_tickets_per_order: max_per_order,
            created_at: now,
            updated_at: now,
        };
        self.events.lock().unwrap().insert(id, event);
        id
    }

    /// Deactivate an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    pub fn deactivate(&self, id: EventId) {
        if let Some(event) = self.events.lock().unwrap().get_mut(&id) {
            event.is_active = false;
        }
    }

    /// Current `seats_available` for an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only code).
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn seats_available(&self, id: EventId) -> Option<i32> {
        self.events
            .lock()
            .unwrap()
            .get(&id)
            .map(|event| event.seats_available)
    }
}

impl InventoryStore for MockInventoryStore {
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        let events = self
            .events
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;
        Ok(events.get(&event_id).cloned())
    }

    async fn decrement_seats(&self, event_id: EventId, count: i32) -> Result<SeatAdjustment> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;
        // Check-and-set under one lock, like the conditional UPDATE.
        match events.get_mut(&event_id) {
            Some(event) if event.seats_available >= count => {
                event.seats_available -= count;
                event.updated_at = Utc::now();
                Ok(SeatAdjustment::Applied {
                    new_available: event.seats_available,
                })
            }
            _ => Ok(SeatAdjustment::Rejected),
        }
    }

    async fn increment_seats(&self, event_id: EventId, count: i32) -> Result<SeatAdjustment> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| BookingError::Database("mock lock poisoned".into()))?;
        match events.get_mut(&event_id) {
            Some(event) if event.seats_available + count <= event.seats_total => {
                event.seats_available += count;
                event.updated_at = Utc::now();
                Ok(SeatAdjustment::Applied {
                    new_available: event.seats_available,
                })
            }
            _ => Ok(SeatAdjustment::Rejected),
        }
    }
}
