//! Outbound adapters implementing the transaction store port.
//!
//! - **persistence**: PostgreSQL via Diesel
//! - **memory**: process-local store for development and tests
//!
//! Adapters translate between domain types and storage representations. They
//! contain no business logic.

pub mod memory;
pub mod persistence;

pub use memory::InMemoryTransactionStore;
