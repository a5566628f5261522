//! `PostgreSQL` registration store.
//!
//! Every status transition is a guarded conditional `UPDATE`; the
//! affected-row count tells the caller whether the registration actually
//! moved, which keeps the lifecycle monotonic under concurrent writers.

use crate::error::{BookingError, Result};
use crate::stores::{NewRegistration, RegistrationStore};
use crate::types::{
    AttendeeDetail, EventId, Registration, RegistrationId, RegistrationStatus,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

/// `PostgreSQL` registration store.
#[derive(Clone)]
pub struct PostgresRegistrationStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    email: String,
    phone: String,
    external_ref: Option<String>,
    tickets: i32,
    ticket_details: Option<Json<Vec<AttendeeDetail>>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = BookingError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        let status = RegistrationStatus::from_str(&row.status)
            .map_err(|e| BookingError::Database(e.to_string()))?;
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            external_ref: row.external_ref,
            tickets: row.tickets,
            ticket_details: row.ticket_details.map(|Json(details)| details),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const REGISTRATION_COLUMNS: &str = "id, event_id, name, email, phone, external_ref, tickets, \
                                    ticket_details, status, created_at, updated_at";

impl PostgresRegistrationStore {
    /// Create a new `PostgreSQL` registration store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a guarded status transition; returns whether a row moved.
    async fn transition(
        &self,
        id: RegistrationId,
        from: &[RegistrationStatus],
        to: RegistrationStatus,
    ) -> Result<bool> {
        let from: Vec<&str> = from.iter().map(RegistrationStatus::as_str).collect();
        let result = sqlx::query(
            "UPDATE registrations
             SET status = $2,
                 updated_at = NOW()
             WHERE id = $1 AND status = ANY($3)",
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(&from)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            BookingError::Database(format!("Failed to transition registration to {to}: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }
}

impl RegistrationStore for PostgresRegistrationStore {
    async fn insert(&self, new: NewRegistration) -> Result<Registration> {
        let id = RegistrationId::new();
        let now = Utc::now();
        let details = new.ticket_details.clone().map(Json);

        sqlx::query(
            "INSERT INTO registrations
                 (id, event_id, name, email, phone, external_ref, tickets,
                  ticket_details, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)",
        )
        .bind(id.as_uuid())
        .bind(new.event_id.as_uuid())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.external_ref)
        .bind(new.tickets)
        .bind(&details)
        .bind(RegistrationStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to insert registration: {e}")))?;

        Ok(Registration {
            id,
            event_id: new.event_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            external_ref: new.external_ref,
            tickets: new.tickets,
            ticket_details: new.ticket_details,
            status: RegistrationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to load registration: {e}")))?;

        row.map(Registration::try_from).transpose()
    }

    async fn mark_payment_initiated(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[RegistrationStatus::Pending],
            RegistrationStatus::PaymentInitiated,
        )
        .await
    }

    async fn mark_paid(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[
                RegistrationStatus::Pending,
                RegistrationStatus::PaymentInitiated,
                RegistrationStatus::PaymentFailed,
            ],
            RegistrationStatus::Paid,
        )
        .await
    }

    async fn mark_payment_failed(&self, id: RegistrationId) -> Result<bool> {
        self.transition(
            id,
            &[
                RegistrationStatus::Pending,
                RegistrationStatus::PaymentInitiated,
            ],
            RegistrationStatus::PaymentFailed,
        )
        .await
    }

    async fn mark_refunded(&self, id: RegistrationId) -> Result<bool> {
        self.transition(id, &[RegistrationStatus::Paid], RegistrationStatus::Refunded)
            .await
    }
}
