//! Client address resolution behind a trusted proxy.
//!
//! When a header name is configured, its value replaces the socket peer as
//! the client address for everything further down the chain. The header is
//! taken verbatim; only deploy this behind a proxy that overwrites it.

use std::cell::OnceCell;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderName;
use actix_web::{Error, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};

/// Client address as reported by the trusted proxy header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(String);

impl ClientAddr {
    /// Effective client address of `req`: the proxy-reported one when
    /// present, else the socket peer.
    pub fn of(req: &HttpRequest) -> Option<String> {
        if let Some(addr) = req.extensions().get::<Self>() {
            return Some(addr.0.clone());
        }
        req.peer_addr().map(|addr| addr.to_string())
    }

    /// Record `addr` as the client address of `req`, including for layers
    /// that read it before [`RealIp`] ran.
    pub fn record(req: &HttpRequest, addr: String) {
        if let Some(slot) = req.extensions().get::<ClientAddrSlot>() {
            slot.fill(&addr);
        }
        req.extensions_mut().insert(Self(addr));
    }
}

/// Client address resolved further down the chain than the reader sits.
///
/// Outer layers attach a slot before calling inward and read it afterwards,
/// so their logs carry the proxy-reported address.
#[derive(Debug, Clone, Default)]
pub struct ClientAddrSlot(Rc<OnceCell<String>>);

impl ClientAddrSlot {
    /// The slot attached to `req`, attaching one if there is none yet.
    pub fn attach(req: &HttpRequest) -> Self {
        if let Some(slot) = req.extensions().get::<Self>() {
            return slot.clone();
        }
        let slot = Self::default();
        req.extensions_mut().insert(slot.clone());
        slot
    }

    /// Proxy-reported address, once recorded.
    pub fn get(&self) -> Option<String> {
        self.0.get().cloned()
    }

    fn fill(&self, addr: &str) {
        // First report wins.
        let _ = self.0.set(addr.to_owned());
    }
}

/// Middleware that trusts `header` for the client address.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use actix_web::http::header::HeaderName;
/// use urlredir::middleware::RealIp;
///
/// let app = App::new().wrap(RealIp::new(Some(HeaderName::from_static("x-real-ip"))));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RealIp {
    header: Option<HeaderName>,
}

impl RealIp {
    /// Trust `header` when `Some`; pass requests through untouched otherwise.
    pub fn new(header: Option<HeaderName>) -> Self {
        Self { header }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RealIp
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RealIpMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RealIpMiddleware {
            service,
            header: self.header.clone(),
        }))
    }
}

/// Service wrapper produced by [`RealIp`].
pub struct RealIpMiddleware<S> {
    service: S,
    header: Option<HeaderName>,
}

impl<S, B> Service<ServiceRequest> for RealIpMiddleware<S>
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
        let reported = self
            .header
            .as_ref()
            .and_then(|name| req.headers().get(name))
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        if let Some(addr) = reported {
            ClientAddr::record(req.request(), addr);
        }
        self.service.call(req)
    }
}
