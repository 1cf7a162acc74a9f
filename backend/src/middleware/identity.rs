//! User identification.
//!
//! Grants every request an [`Identity`], either a fixed one (development and
//! tests) or whatever a trusted authenticating proxy put in a header. No
//! credentials are checked here.

use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderName;
use actix_web::Error;
use futures_util::future::{Ready, ready};

use crate::domain::Identity;
use crate::inbound::http::RequestContext;

/// Where identities come from.
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// Every request acts as this identity.
    Static(Identity),
    /// Read the user name from this header; a missing or empty header yields
    /// [`Identity::Anonymous`].
    Header(HeaderName),
}

impl IdentitySource {
    fn identify(&self, req: &ServiceRequest) -> Identity {
        match self {
            Self::Static(identity) => identity.clone(),
            Self::Header(name) => Identity::from_raw(
                req.headers()
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Middleware attaching an [`Identity`] to the request context.
#[derive(Debug, Clone)]
pub struct Identify {
    source: IdentitySource,
}

impl Identify {
    /// Identify requests from `source`.
    pub fn new(source: IdentitySource) -> Self {
        Self { source }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Identify
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentifyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentifyMiddleware {
            service,
            source: self.source.clone(),
        }))
    }
}

/// Service wrapper produced by [`Identify`].
pub struct IdentifyMiddleware<S> {
    service: S,
    source: IdentitySource,
}

impl<S, B> Service<ServiceRequest> for IdentifyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = self.source.identify(&req);
        RequestContext::of(req.request())
            .with_identity(identity)
            .attach(req.request());
        self.service.call(req)
    }
}
