//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Implements the `TransactionStore` port on `diesel-async` with `bb8`
//! connection pooling. Diesel row structs (`models.rs`) and the schema
//! (`schema.rs`) stay internal; only domain types cross this boundary.
//!
//! # Example
//!
//! ```ignore
//! use urlredir::outbound::persistence::{DbPool, DieselTransactionStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("host=localhost dbname=urlredir")).await?;
//! let store = DieselTransactionStore::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_transaction_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_transaction_store::DieselTransactionStore;
pub use migrations::{MIGRATIONS, MigrationError, apply_migrations};
pub use pool::{DbPool, PoolConfig, PoolError, SchemaName};
