//! `PostgreSQL` storage for fleet allocation.
//!
//! This crate provides the production implementations of the store traits
//! from `fleet-allocation-core`:
//!
//! - [`PostgresFleetStore`]: bookings, vehicle assignments and the audit log
//! - [`PostgresNotificationOutbox`]: in-app notification inbox used as the
//!   [`Notifier`](fleet_allocation_core::Notifier)
//!
//! [`BookingStore::edit`](fleet_allocation_core::BookingStore::edit) runs in
//! one transaction that locks the booking row and its assignment rows, then
//! writes the new allocations and applies the reconciliation plan before
//! committing. Allocation edits on one booking therefore serialize in the
//! database across service instances and processes. Vendor submission is a
//! conditional `UPDATE … WHERE status = 'draft'`.
//!
//! # Example
//!
//! ```ignore
//! use fleet_allocation_postgres::PostgresFleetStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = fleet_allocation_runtime::ServiceConfig::from_env()?;
//!     let store = PostgresFleetStore::from_config(&config.database).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assignments;
mod audit;
mod bookings;
mod outbox;

pub use outbox::{DEFAULT_INBOX_LIMIT, InboxEntry, PostgresNotificationOutbox};

use fleet_allocation_core::{AllocationError, Result};
use fleet_allocation_runtime::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// `PostgreSQL`-backed booking, assignment and audit store.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresFleetStore {
    pool: PgPool,
}

impl PostgresFleetStore {
    /// Store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| AllocationError::Storage(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Open a connection pool sized and timed by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if the database is unreachable.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| AllocationError::Storage(format!("Failed to connect: {e}")))?;
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "PostgreSQL pool connected"
        );
        Ok(Self::new(pool))
    }

    /// Pool options for `config`, without connecting.
    #[must_use]
    pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
    }

    /// Run the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AllocationError::Storage(format!("Failed to run migrations: {e}")))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Wrap a database error with a short description of the failed operation.
fn storage(action: &'static str) -> impl Fn(sqlx::Error) -> AllocationError {
    move |e| AllocationError::Storage(format!("Failed to {action}: {e}"))
}

/// Whether `error` is a unique-constraint violation.
fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

fn to_db_count(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| AllocationError::Storage(format!("{field} out of range: {value}")))
}

fn from_db_count(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| AllocationError::Storage(format!("{field} out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_options_follow_config() {
        let config = DatabaseConfig {
            url: "postgres://db/fleet".to_string(),
            max_connections: 7,
            min_connections: 2,
            connect_timeout: 12,
        };

        let options = PostgresFleetStore::pool_options(&config);

        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(12));
    }
}
