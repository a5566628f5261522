//! `PostgreSQL` payment store.
//!
//! Carries the single most important correctness mechanism in the core:
//! the success claim, a database-level conditional update whose
//! affected-row signal decides which concurrent caller owns the follow-up
//! effects. A partial unique index on `(registration_id) WHERE status =
//! 'succeeded'` additionally guarantees at most one succeeded attempt per
//! registration across retried checkouts.

use crate::error::{BookingError, Result};
use crate::stores::{FailureMark, NewPayment, PaymentStore, SuccessClaim};
use crate::types::{Currency, Money, Payment, PaymentId, PaymentStatus, RegistrationId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// `PostgreSQL` payment store.
#[derive(Clone)]
pub struct PostgresPaymentStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    registration_id: Uuid,
    provider_order_id: String,
    provider_payment_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    raw_event: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = BookingError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let status = PaymentStatus::from_str(&row.status)
            .map_err(|e| BookingError::Database(e.to_string()))?;
        let currency = Currency::new(&row.currency)
            .map_err(|c| BookingError::Database(format!("Invalid stored currency: {c}")))?;
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            registration_id: RegistrationId::from_uuid(row.registration_id),
            provider_order_id: row.provider_order_id,
            provider_payment_id: row.provider_payment_id,
            amount: Money::from_minor(row.amount),
            currency,
            status,
            raw_event: row.raw_event,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, registration_id, provider_order_id, provider_payment_id, \
                               amount, currency, status, raw_event, created_at, updated_at";

impl PostgresPaymentStore {
    /// Create a new `PostgreSQL` payment store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PaymentStore for PostgresPaymentStore {
    async fn insert(&self, new: NewPayment) -> Result<Payment> {
        let id = PaymentId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO payments
                 (id, registration_id, provider_order_id, provider_payment_id,
                  amount, currency, status, raw_event, created_at, updated_at)
             VALUES ($1, $2, $3, NULL, $4, $5, $6, NULL, $7, $7)",
        )
        .bind(id.as_uuid())
        .bind(new.registration_id.as_uuid())
        .bind(&new.provider_order_id)
        .bind(new.amount.minor_units())
        .bind(new.currency.as_str())
        .bind(PaymentStatus::Initiated.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to insert payment: {e}")))?;

        Ok(Payment {
            id,
            registration_id: new.registration_id,
            provider_order_id: new.provider_order_id,
            provider_payment_id: None,
            amount: new.amount,
            currency: new.currency,
            status: PaymentStatus::Initiated,
            raw_event: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_order_id(&self, provider_order_id: &str) -> Result<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider_order_id = $1"
        ))
        .bind(provider_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to load payment: {e}")))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_latest_for_registration(&self, id: RegistrationId) -> Result<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE registration_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to load payment: {e}")))?;

        row.map(Payment::try_from).transpose()
    }

    async fn claim_success(
        &self,
        provider_order_id: &str,
        provider_payment_id: Option<&str>,
        raw_event: Option<&serde_json::Value>,
    ) -> Result<SuccessClaim> {
        // Single conditional update; the RETURNING row means this caller
        // won the claim. Never a read followed by a separate write.
        let claimed: std::result::Result<Option<PaymentRow>, sqlx::Error> = sqlx::query_as(&format!(
            "UPDATE payments
             SET status = $2,
                 provider_payment_id = COALESCE($3, provider_payment_id),
                 raw_event = COALESCE($4, raw_event),
                 updated_at = NOW()
             WHERE provider_order_id = $1 AND status <> $2
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(provider_order_id)
        .bind(PaymentStatus::Succeeded.as_str())
        .bind(provider_payment_id)
        .bind(raw_event)
        .fetch_optional(&self.pool)
        .await;

        match claimed {
            Ok(Some(row)) => Ok(SuccessClaim::Claimed(Payment::try_from(row)?)),
            Ok(None) => {
                // Lost the claim or the order never existed; one read to
                // tell the two apart (no write either way).
                let exists: Option<(String,)> =
                    sqlx::query_as("SELECT status FROM payments WHERE provider_order_id = $1")
                        .bind(provider_order_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| {
                            BookingError::Database(format!("Failed to check payment: {e}"))
                        })?;
                Ok(exists.map_or(SuccessClaim::NotFound, |_| SuccessClaim::AlreadyProcessed))
            }
            Err(e) => {
                // The partial unique index fires when a different attempt
                // for the same registration already succeeded.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return Ok(SuccessClaim::AlreadyProcessed);
                    }
                }
                Err(BookingError::Database(format!(
                    "Failed to claim payment success: {e}"
                )))
            }
        }
    }

    async fn mark_failed(
        &self,
        provider_order_id: &str,
        raw_event: Option<&serde_json::Value>,
    ) -> Result<FailureMark> {
        let marked: Option<PaymentRow> = sqlx::query_as(&format!(
            "UPDATE payments
             SET status = $2,
                 raw_event = COALESCE($3, raw_event),
                 updated_at = NOW()
             WHERE provider_order_id = $1 AND status = ANY($4)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(provider_order_id)
        .bind(PaymentStatus::Failed.as_str())
        .bind(raw_event)
        .bind(vec![
            PaymentStatus::Initiated.as_str(),
            PaymentStatus::Authorized.as_str(),
        ])
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to mark payment failed: {e}")))?;

        match marked {
            Some(row) => Ok(FailureMark::Marked(Payment::try_from(row)?)),
            None => {
                let exists: Option<(String,)> =
                    sqlx::query_as("SELECT status FROM payments WHERE provider_order_id = $1")
                        .bind(provider_order_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| {
                            BookingError::Database(format!("Failed to check payment: {e}"))
                        })?;
                Ok(exists.map_or(FailureMark::NotFound, |_| FailureMark::AlreadyTerminal))
            }
        }
    }

    async fn mark_authorized(&self, provider_order_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments
             SET status = $2,
                 updated_at = NOW()
             WHERE provider_order_id = $1 AND status = $3",
        )
        .bind(provider_order_id)
        .bind(PaymentStatus::Authorized.as_str())
        .bind(PaymentStatus::Initiated.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to mark payment authorized: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_informational(
        &self,
        provider_order_id: &str,
        raw_event: &serde_json::Value,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments
             SET raw_event = $2,
                 updated_at = NOW()
             WHERE provider_order_id = $1",
        )
        .bind(provider_order_id)
        .bind(raw_event)
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::Database(format!("Failed to record provider event: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}
