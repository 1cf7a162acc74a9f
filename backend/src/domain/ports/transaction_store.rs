//! Port for units of work against the link store.
//!
//! The transaction middleware opens one [`Transaction`] per request through
//! [`TransactionStore::begin`] and is the only party able to finish it:
//! `commit` and `rollback` consume the boxed transaction, while handlers only
//! ever see `&mut` access to the row operations.

use async_trait::async_trait;

use crate::domain::{LinkId, LinkSummary, NewHit, NewLink, ShortName, TargetUrl, UserName};

use super::define_port_error;

define_port_error! {
    /// Errors raised by transaction store adapters.
    pub enum StoreError {
        /// A lookup matched no rows.
        NotFound => "no rows in result set",
        /// The short name is already registered.
        Duplicate { name: String } => "short name already exists: {name}",
        /// The transaction was already committed or rolled back.
        Finished => "transaction has already been committed or rolled back",
        /// Store connection could not be established or was lost.
        Connection { message: String } => "store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "store query failed: {message}",
    }
}

/// Opens units of work.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Begin a transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// One open unit of work.
///
/// Dropping a transaction without finishing it abandons its changes.
#[async_trait]
pub trait Transaction: Send {
    /// Increment the hit counter of `name` and return its target and id in
    /// one atomic step.
    async fn lookup_and_increment_hit(
        &mut self,
        name: &ShortName,
    ) -> Result<(TargetUrl, LinkId), StoreError>;

    /// Return the id and owner of `name`.
    async fn lookup_owner(&mut self, name: &ShortName) -> Result<(LinkId, UserName), StoreError>;

    /// Append a hit record.
    async fn record_hit(&mut self, hit: &NewHit) -> Result<(), StoreError>;

    /// Register a new short link; fails with [`StoreError::Duplicate`] when
    /// the name is taken.
    async fn insert_mapping(&mut self, link: &NewLink) -> Result<(), StoreError>;

    /// Remove `name`, together with its hits.
    async fn delete_mapping(&mut self, name: &ShortName) -> Result<(), StoreError>;

    /// Links owned by `owner`, oldest first. Empty when there are none.
    async fn list_mappings_for_user(
        &mut self,
        owner: &UserName,
    ) -> Result<Vec<LinkSummary>, StoreError>;

    /// Make the transaction's changes durable.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard the transaction's changes.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
