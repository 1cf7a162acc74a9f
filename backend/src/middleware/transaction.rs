//! Transaction management.
//!
//! Opens one transaction per request, attaches it to the request context and
//! finishes it once the inner chain has answered:
//!
//! - a response commits or rolls back according to its [`TxDirective`];
//! - an error escaping the inner chain rolls back;
//! - a panic rolls back and is then re-raised unchanged, unless the rollback
//!   itself fails, in which case the rollback failure is raised instead.
//!
//! A transaction already finished elsewhere is not an error. Any other
//! failure to finish replaces the response with a 500. If the request future
//! is dropped (client gone) the transaction is dropped unfinished, which
//! discards its changes.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::warn;

use crate::domain::DomainError;
use crate::domain::ports::{StoreError, TransactionStore};
use crate::inbound::http::error::RequestMeta;
use crate::inbound::http::{RequestContext, TxDirective, TxHandle};

use super::recover::internal_failure;

/// Middleware granting each request a transaction from `store`.
#[derive(Clone)]
pub struct Transactional {
    store: Arc<dyn TransactionStore>,
}

impl Transactional {
    /// Open transactions on `store`.
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Transactional
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = TransactionalMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TransactionalMiddleware {
            service: Rc::new(service),
            store: Arc::clone(&self.store),
        }))
    }
}

/// Service wrapper produced by [`Transactional`].
pub struct TransactionalMiddleware<S> {
    service: Rc<S>,
    store: Arc<dyn TransactionStore>,
}

impl<S, B> Service<ServiceRequest> for TransactionalMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let store = Arc::clone(&self.store);
        Box::pin(async move {
            let meta = RequestMeta::of(req.request());
            let handle = match store.begin().await {
                Ok(transaction) => TxHandle::new(transaction),
                Err(err) => return Err(internal_failure(DomainError::from(err), &meta)),
            };
            RequestContext::of(req.request())
                .with_transaction(handle.clone())
                .attach(req.request());

            let outcome = AssertUnwindSafe(async move { service.call(req).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(res)) => {
                    let directive = TxDirective::of(res.response());
                    match finish(&handle, directive).await {
                        Ok(()) => Ok(res),
                        Err(error) => Err(internal_failure(error, &meta)),
                    }
                }
                Ok(Err(err)) => match finish(&handle, TxDirective::Rollback).await {
                    Ok(()) => Err(err),
                    Err(error) => {
                        warn!(error = %err, "inner error superseded by rollback failure");
                        Err(internal_failure(error, &meta))
                    }
                },
                Err(payload) => {
                    if let Err(error) = finish(&handle, TxDirective::Rollback).await {
                        panic::resume_unwind(Box::new(error));
                    }
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}

/// Finish `handle`, treating an already finished transaction as done.
async fn finish(handle: &TxHandle, directive: TxDirective) -> Result<(), DomainError> {
    match handle.finish(directive).await {
        Ok(()) | Err(StoreError::Finished) => Ok(()),
        Err(err) => Err(match directive {
            TxDirective::Commit => DomainError::from(err),
            TxDirective::Rollback => DomainError::failed_rollback(err),
        }),
    }
}
