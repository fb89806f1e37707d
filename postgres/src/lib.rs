//! `PostgreSQL` show catalog for showgrid.
//!
//! Implements the relational store contract over sqlx: a pool-backed
//! [`PgShowStore`] for auto-committed calls and a [`PgShowTransaction`]
//! handle that runs the same operations inside one database transaction.
//!
//! # Example
//!
//! ```ignore
//! use showgrid_postgres::PgShowStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgShowStore::connect("postgres://localhost/showgrid").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod queries;
mod store;

pub use store::{PgShowStore, PgShowTransaction};

use showgrid_core::StoreError;

/// Map a sqlx error onto the store taxonomy.
///
/// Errors raised by the data itself (constraint violations, decode failures,
/// missing rows) are [`StoreError::Data`]; connection, pool, and protocol
/// failures are [`StoreError::Service`].
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::Data(db.to_string()),
        sqlx::Error::RowNotFound
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Data(err.to_string()),
        other => StoreError::Service(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_a_data_error() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::Data(_)
        ));
    }

    #[test]
    fn pool_timeout_is_a_service_error() {
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Service(_)
        ));
    }
}
