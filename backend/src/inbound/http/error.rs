//! HTTP adapter mapping for domain errors.
//!
//! Every failure that reaches a client goes through [`resolve`], which picks
//! the status and plain-text body and writes one log line carrying the request
//! metadata. Internal detail never reaches the body: anything without an
//! explicit HTTP status renders as the bare reason phrase.

use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use tracing::{error, info};

use crate::domain::DomainError;
use crate::middleware::real_ip::{ClientAddr, ClientAddrSlot};

/// Request attributes recorded alongside every resolved error.
///
/// Safe to capture before [`RealIp`](crate::middleware::RealIp) runs: a
/// proxy-reported address recorded later still shows up in [`Self::remote`].
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    method: String,
    path: String,
    peer: String,
    reported: ClientAddrSlot,
}

impl RequestMeta {
    /// Capture method, path and client address from `req`.
    pub fn of(req: &HttpRequest) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.path().to_owned(),
            peer: ClientAddr::of(req).unwrap_or_default(),
            reported: ClientAddrSlot::attach(req),
        }
    }

    /// Effective client address as of now.
    pub fn remote(&self) -> String {
        self.reported.get().unwrap_or_else(|| self.peer.clone())
    }
}

/// Status and body an error renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Response status.
    pub status: StatusCode,
    /// Plain-text response body.
    pub message: String,
}

impl Resolution {
    fn reason(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }

    /// Render as a `text/plain` response.
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status)
            .content_type(ContentType::plaintext())
            .body(self.message)
    }
}

/// Map an error to its status and body without logging.
///
/// Explicit HTTP errors win, then the store's "no rows" sentinel becomes 404,
/// and everything else is a 500.
pub fn classify(error: &DomainError) -> Resolution {
    match error {
        DomainError::Http(http) => {
            let status =
                StatusCode::from_u16(http.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if http.message().is_empty() {
                Resolution::reason(status)
            } else {
                Resolution {
                    status,
                    message: http.message().to_owned(),
                }
            }
        }
        _ if error.is_not_found() => Resolution::reason(StatusCode::NOT_FOUND),
        _ => Resolution::reason(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Classify `error` and log the outcome against `meta`.
pub fn resolve(error: &DomainError, meta: &RequestMeta) -> Resolution {
    let resolution = classify(error);
    log_resolution(error, meta, resolution.status);
    resolution
}

/// Resolve a failure that must surface as a 500 whatever its kind, such as a
/// recovered panic or an escalated handler error.
pub fn resolve_internal(error: &DomainError, meta: &RequestMeta) -> Resolution {
    let resolution = Resolution::reason(StatusCode::INTERNAL_SERVER_ERROR);
    log_resolution(error, meta, resolution.status);
    resolution
}

/// Render a handler failure for `req`.
pub fn render(req: &HttpRequest, error: &DomainError) -> HttpResponse {
    resolve(error, &RequestMeta::of(req)).into_response()
}

fn log_resolution(error: &DomainError, meta: &RequestMeta, status: StatusCode) {
    let remote = meta.remote();
    if status.is_server_error() {
        error!(
            method = %meta.method,
            path = %meta.path,
            remote = %remote,
            status = status.as_u16(),
            error = %error,
            "request failed"
        );
    } else {
        info!(
            method = %meta.method,
            path = %meta.path,
            remote = %remote,
            status = status.as_u16(),
            error = %error,
            "request rejected"
        );
    }
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        classify(self).status
    }

    fn error_response(&self) -> HttpResponse {
        classify(self).into_response()
    }
}
