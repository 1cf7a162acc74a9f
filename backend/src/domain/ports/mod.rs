//! Domain ports and supporting types for the hexagonal boundary.
//!
//! The request pipeline drives storage exclusively through
//! [`TransactionStore`]; adapters live under `crate::outbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod transaction_store;

#[cfg(test)]
pub use transaction_store::MockTransactionStore;
pub use transaction_store::{StoreError, Transaction, TransactionStore};
