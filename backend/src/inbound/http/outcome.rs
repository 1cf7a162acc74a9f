//! Handler outcomes and the transaction directive they carry.
//!
//! A handler returns an [`Outcome`]; rendering it stamps a [`TxDirective`]
//! into the response extensions, which the transaction middleware reads to
//! decide between commit and rollback.

use actix_web::body::BoxBody;
use actix_web::{HttpRequest, HttpResponse, Responder};

use crate::domain::DomainError;

use super::error::{RequestMeta, classify, render, resolve_internal};

/// How the request's transaction must end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxDirective {
    /// Make the changes durable.
    Commit,
    /// Discard the changes.
    Rollback,
}

impl TxDirective {
    /// Directive for a finished response.
    ///
    /// An explicit directive from [`Outcome`] wins. Otherwise success and
    /// redirect statuses commit while error statuses, or a response carrying
    /// an error, roll back.
    pub fn of<B>(response: &HttpResponse<B>) -> Self {
        if let Some(directive) = response.extensions().get::<Self>() {
            return *directive;
        }
        let status = response.status();
        if response.error().is_some() || status.is_client_error() || status.is_server_error() {
            Self::Rollback
        } else {
            Self::Commit
        }
    }
}

/// Result of a transactional handler.
#[derive(Debug)]
pub enum Outcome {
    /// Send the response and commit.
    Commit(HttpResponse),
    /// The request was refused. Render the error as-is and roll back.
    Rollback(DomainError),
    /// Something broke. Roll back and answer 500 whatever the error kind.
    Escalate(DomainError),
}

impl Outcome {
    /// Sort a handler result: client rejections roll back with their own
    /// status, anything else escalates.
    pub fn from_result(result: Result<HttpResponse, DomainError>) -> Self {
        match result {
            Ok(response) => Self::Commit(response),
            Err(error) if classify(&error).status.is_client_error() => Self::Rollback(error),
            Err(error) => Self::Escalate(error),
        }
    }

    /// The directive this outcome stamps on its response.
    pub fn directive(&self) -> TxDirective {
        match self {
            Self::Commit(_) => TxDirective::Commit,
            Self::Rollback(_) | Self::Escalate(_) => TxDirective::Rollback,
        }
    }
}

impl From<Result<HttpResponse, DomainError>> for Outcome {
    fn from(result: Result<HttpResponse, DomainError>) -> Self {
        Self::from_result(result)
    }
}

impl Responder for Outcome {
    type Body = BoxBody;

    fn respond_to(self, req: &HttpRequest) -> HttpResponse<Self::Body> {
        let directive = self.directive();
        let mut response = match self {
            Self::Commit(response) => response,
            Self::Rollback(error) => render(req, &error),
            Self::Escalate(error) => resolve_internal(&error, &RequestMeta::of(req)).into_response(),
        };
        response.extensions_mut().insert(directive);
        response
    }
}
