//! Request-scoped context.
//!
//! Middleware grants capabilities to a request by deriving a new
//! [`RequestContext`] and attaching it to the request's extensions; handlers
//! read it through the [`FromRequest`] extractor. A context is never shared
//! between requests: it lives in the extensions of exactly one
//! `HttpRequest` and is dropped with it.

use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::domain::ports::{StoreError, Transaction};
use crate::domain::{DomainError, Identity, Sentinel};

use super::outcome::TxDirective;

type Slot = Option<Box<dyn Transaction>>;

/// Borrowable handle to the request's transaction.
///
/// Handlers reach the row operations through [`TxHandle::lease`]; only the
/// transaction middleware can finish the transaction, after which every
/// lease fails with [`StoreError::Finished`].
#[derive(Clone)]
pub struct TxHandle {
    slot: Arc<Mutex<Slot>>,
}

impl TxHandle {
    pub(crate) fn new(transaction: Box<dyn Transaction>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(transaction))),
        }
    }

    /// Borrow the open transaction.
    ///
    /// # Errors
    /// [`StoreError::Finished`] once the transaction has been committed or
    /// rolled back.
    pub async fn lease(&self) -> Result<MappedMutexGuard<'_, Box<dyn Transaction>>, StoreError> {
        let guard = self.slot.lock().await;
        MutexGuard::try_map(guard, Option::as_mut).map_err(|_| StoreError::finished())
    }

    /// Commit or roll back, leaving the handle empty.
    pub(crate) async fn finish(&self, directive: TxDirective) -> Result<(), StoreError> {
        let transaction = self.slot.lock().await.take().ok_or_else(StoreError::finished)?;
        match directive {
            TxDirective::Commit => transaction.commit().await,
            TxDirective::Rollback => transaction.rollback().await,
        }
    }
}

/// Capabilities granted to one request.
///
/// Values are immutable: `with_*` returns a new context and leaves the
/// receiver untouched. A missing field means the capability has not been
/// granted, which the `require_*` accessors report as a typed error.
#[derive(Clone, Default)]
pub struct RequestContext {
    transaction: Option<TxHandle>,
    identity: Option<Identity>,
}

impl RequestContext {
    /// Context with `handle` attached under the transaction key.
    #[must_use]
    pub fn with_transaction(&self, handle: TxHandle) -> Self {
        Self {
            transaction: Some(handle),
            identity: self.identity.clone(),
        }
    }

    /// Context with `identity` attached under the user key.
    #[must_use]
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            transaction: self.transaction.clone(),
            identity: Some(identity),
        }
    }

    /// The transaction, if one has been granted.
    pub fn transaction(&self) -> Option<&TxHandle> {
        self.transaction.as_ref()
    }

    /// The identity, if one has been granted.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The transaction or [`Sentinel::NoTransaction`].
    pub fn require_transaction(&self) -> Result<&TxHandle, DomainError> {
        self.transaction
            .as_ref()
            .ok_or(DomainError::Sentinel(Sentinel::NoTransaction))
    }

    /// The identity or [`Sentinel::MissingUser`].
    pub fn require_identity(&self) -> Result<&Identity, DomainError> {
        self.identity
            .as_ref()
            .ok_or(DomainError::Sentinel(Sentinel::MissingUser))
    }

    /// Context currently attached to `req`; empty when none is.
    pub fn of(req: &HttpRequest) -> Self {
        req.extensions().get::<Self>().cloned().unwrap_or_default()
    }

    /// Attach this context to `req`, superseding the previous one.
    pub fn attach(self, req: &HttpRequest) {
        req.extensions_mut().insert(self);
    }
}

impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self::of(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{ScriptedTransaction, TransactionLog};
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    fn empty_context_reports_missing_capabilities() {
        let ctx = RequestContext::default();

        let tx_err = ctx.require_transaction().err().expect("no transaction");
        let user_err = ctx.require_identity().err().expect("no identity");

        assert_eq!(tx_err.sentinel(), Some(Sentinel::NoTransaction));
        assert_eq!(user_err.sentinel(), Some(Sentinel::MissingUser));
    }

    #[rstest]
    fn with_identity_leaves_the_original_untouched() {
        let original = RequestContext::default();
        let derived = original.with_identity(Identity::from_raw("ada"));

        assert!(original.identity().is_none());
        assert_eq!(derived.identity(), Some(&Identity::from_raw("ada")));
    }

    #[rstest]
    fn with_transaction_keeps_existing_identity() {
        let log = TransactionLog::default();
        let ctx = RequestContext::default()
            .with_identity(Identity::Anonymous)
            .with_transaction(TxHandle::new(Box::new(ScriptedTransaction::new(&log))));

        assert!(ctx.transaction().is_some());
        assert_eq!(ctx.identity(), Some(&Identity::Anonymous));
    }

    #[rstest]
    fn attached_context_is_visible_on_the_request() {
        let req = TestRequest::default().to_http_request();
        assert!(RequestContext::of(&req).identity().is_none());

        RequestContext::default()
            .with_identity(Identity::from_raw("ada"))
            .attach(&req);

        assert_eq!(
            RequestContext::of(&req).identity(),
            Some(&Identity::from_raw("ada"))
        );
    }

    #[tokio::test]
    async fn finished_handle_refuses_leases() {
        let log = TransactionLog::default();
        let handle = TxHandle::new(Box::new(ScriptedTransaction::new(&log)));

        assert!(handle.lease().await.is_ok());
        handle
            .finish(TxDirective::Commit)
            .await
            .expect("first finish commits");

        assert!(matches!(handle.lease().await, Err(StoreError::Finished)));
        assert_eq!(
            handle.finish(TxDirective::Rollback).await,
            Err(StoreError::Finished)
        );
        assert_eq!(log.events(), vec!["commit"]);
    }
}
