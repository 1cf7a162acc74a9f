//! Diesel and pool error mapping onto [`StoreError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::StoreError;

use super::pool::PoolError;

/// Map a pool failure to a connection error.
pub(crate) fn map_pool_error(error: PoolError) -> StoreError {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
        PoolError::InvalidSchema { name } => format!("invalid schema name: {name}"),
    };
    StoreError::connection(message)
}

/// Map a Diesel failure.
///
/// `NotFound` keeps its meaning so callers can turn it into a 404; a unique
/// violation becomes [`StoreError::Duplicate`] for `name` when one is given.
/// Server messages are logged at debug level and never copied into the error.
pub(crate) fn map_diesel_error(error: DieselError, name: Option<&str>) -> StoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreError::not_found(),
        DieselError::QueryBuilderError(_) => StoreError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => match name {
            Some(name) => StoreError::duplicate(name),
            None => StoreError::query("unique constraint violated"),
        },
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreError::connection("database connection error")
        }
        DieselError::BrokenTransactionManager | DieselError::AlreadyInTransaction => {
            StoreError::connection("transaction state lost")
        }
        _ => StoreError::query("database error"),
    }
}
