//! `PostgreSQL` implementations of the storage contracts.
//!
//! Queries are runtime-checked (`sqlx::query_as` with binds) rather than
//! compile-time macros so the workspace builds without a live database;
//! the schema lives in `migrations/`.

mod inventory;
mod payments;
mod registrations;

pub use inventory::PostgresInventoryStore;
pub use payments::PostgresPaymentStore;
pub use registrations::PostgresRegistrationStore;

use crate::error::{BookingError, Result};
use sqlx::PgPool;

/// Run database migrations.
///
/// # Errors
///
/// Returns [`BookingError::Database`] if migrations fail.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BookingError::Database(format!("Migration failed: {e}")))?;
    Ok(())
}
