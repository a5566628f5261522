//! `PostgreSQL` event inventory store.
//!
//! The seat counter is only ever touched through single conditional
//! `UPDATE` statements; the affected-row signal is the authority on
//! whether capacity allowed the adjustment.

use crate::error::{BookingError, Result};
use crate::stores::{InventoryStore, SeatAdjustment};
use crate::types::{Currency, Event, EventId, Money};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL` inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    seats_total: i32,
    seats_available: i32,
    price: i64,
    currency: String,
    is_active: bool,
    max_tickets_per_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = BookingError;

    fn try_from(row: EventRow) -> Result<Self> {
        let currency = Currency::new(&row.currency)
            .map_err(|c| BookingError::Database(format!("Invalid stored currency: {c}")))?;
        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            seats_total: row.seats_total,
            seats_available: row.seats_available,
            price: Money::from_minor(row.price),
            currency,
            is_active: row.is_active,
            max_tickets_per_order: row.max_tickets_per_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PostgresInventoryStore {
    /// Create a new `PostgreSQL` inventory store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl InventoryStore for PostgresInventoryStore {
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(
            "SELECT id, title, description, seats_total, seats_available, price,
                    currency, is_active, max_tickets_per_order, created_at, updated_at
             FROM events
             WHERE id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to load event: {e}")))?;

        row.map(Event::try_from).transpose()
    }

    async fn decrement_seats(&self, event_id: EventId, count: i32) -> Result<SeatAdjustment> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE events
             SET seats_available = seats_available - $2,
                 updated_at = NOW()
             WHERE id = $1 AND seats_available >= $2
             RETURNING seats_available",
        )
        .bind(event_id.as_uuid())
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to decrement seats: {e}")))?;

        // No row matched: either capacity was exhausted by a race or the
        // event is gone; both are a rejected adjustment to the caller.
        Ok(row.map_or(SeatAdjustment::Rejected, |(new_available,)| {
            SeatAdjustment::Applied { new_available }
        }))
    }

    async fn increment_seats(&self, event_id: EventId, count: i32) -> Result<SeatAdjustment> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE events
             SET seats_available = seats_available + $2,
                 updated_at = NOW()
             WHERE id = $1 AND seats_available + $2 <= seats_total
             RETURNING seats_available",
        )
        .bind(event_id.as_uuid())
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to increment seats: {e}")))?;

        Ok(row.map_or(SeatAdjustment::Rejected, |(new_available,)| {
            SeatAdjustment::Applied { new_available }
        }))
    }
}
