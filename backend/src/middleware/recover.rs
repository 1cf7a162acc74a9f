//! Outermost safety net: turns panics below it into 500 responses.
//!
//! A panic payload that already is a [`DomainError`] keeps its cause for the log;
//! anything else becomes [`Sentinel::Unknown`] carrying the panic message.
//! Clients only ever see the generic 500 body.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};

use crate::domain::{DomainError, Sentinel};
use crate::inbound::http::error::{RequestMeta, resolve_internal};

/// Recover the error a panic carried.
///
/// # Examples
/// ```
/// use urlredir::domain::Sentinel;
/// use urlredir::middleware::recover::panic_error;
///
/// let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
/// let error = panic_error(payload);
/// assert_eq!(error.sentinel(), Some(Sentinel::Unknown));
/// assert!(error.to_string().contains("boom"));
/// ```
pub fn panic_error(payload: Box<dyn Any + Send>) -> DomainError {
    let payload = match payload.downcast::<DomainError>() {
        Ok(error) => return *error,
        Err(other) => other,
    };
    let payload = match payload.downcast::<String>() {
        Ok(message) => return DomainError::unknown(*message),
        Err(other) => other,
    };
    match payload.downcast::<&'static str>() {
        Ok(message) => DomainError::unknown(*message),
        Err(_) => DomainError::from(Sentinel::Unknown),
    }
}

/// Build the 500 sent in place of a response that could not be produced,
/// logging `error` against `meta`.
pub(crate) fn internal_failure(error: DomainError, meta: &RequestMeta) -> actix_web::Error {
    let response = resolve_internal(&error, meta).into_response();
    InternalError::from_response(error, response).into()
}

/// Panic-recovery middleware.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use urlredir::middleware::Recover;
///
/// let app = App::new().wrap(Recover);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Recover;

impl<S, B> Transform<S, ServiceRequest> for Recover
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RecoverMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoverMiddleware { service }))
    }
}

/// Service wrapper produced by [`Recover`].
pub struct RecoverMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RecoverMiddleware<S>
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
        let meta = RequestMeta::of(req.request());
        match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => Box::pin(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => Err(internal_failure(panic_error(payload), &meta)),
                }
            }),
            Err(payload) => Box::pin(ready(Err(internal_failure(panic_error(payload), &meta)))),
        }
    }
}
