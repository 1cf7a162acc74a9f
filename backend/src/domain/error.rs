//! Failure taxonomy shared by handlers, middleware and store adapters.
//!
//! These errors are transport agnostic. [`HttpError`] carries a numeric
//! status, but turning a [`DomainError`] into an actual response happens in
//! `inbound::http::error`.

use std::error::Error as StdError;

use crate::domain::ports::StoreError;

/// Boxed cause attached to a wrapped sentinel.
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Closed set of comparable failure kinds.
///
/// The display strings are part of the observable contract: validation
/// failures on the admin form are returned verbatim to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Sentinel {
    /// Rolling back a transaction failed.
    #[error("failed rollback")]
    FailedRollback,
    /// The remote address could not be parsed as an IP address.
    #[error("invalid IP")]
    InvalidIp,
    /// A submitted target URL does not parse.
    #[error("invalid URL")]
    InvalidUrl,
    /// The short name field was empty.
    #[error("missing name")]
    MissingName,
    /// The target URL field was empty.
    #[error("missing URL")]
    MissingUrl,
    /// No user is available for the request.
    #[error("missing user")]
    MissingUser,
    /// No transaction was attached to the request.
    #[error("no tx")]
    NoTransaction,
    /// Anything else, typically a recovered panic.
    #[error("unknown error")]
    Unknown,
}

/// Failure carrying an explicit HTTP status.
///
/// ## Invariants
/// - `status` is a valid HTTP status code (100–999).
/// - An empty `message` means "use the canonical reason phrase".
#[derive(Debug, thiserror::Error)]
#[error("{status} {message}")]
pub struct HttpError {
    status: u16,
    message: String,
    #[source]
    cause: Option<Box<DomainError>>,
}

impl HttpError {
    /// Create an error with the given status and client-facing message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying failure.
    pub fn with_cause(mut self, cause: impl Into<DomainError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }

    /// Numeric HTTP status.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Client-facing message; empty when the reason phrase should be used.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// The wrapped failure, if any.
    pub fn cause(&self) -> Option<&DomainError> {
        self.cause.as_deref()
    }
}

/// Any failure that crosses the handler boundary.
///
/// Every variant is a sentinel, wraps one, or is a storage-layer sentinel.
///
/// # Examples
/// ```
/// use urlredir::domain::{DomainError, Sentinel};
///
/// let err = DomainError::bad_request(Sentinel::MissingName);
/// assert_eq!(err.sentinel(), Some(Sentinel::MissingName));
/// assert_eq!(err.to_string(), "400 missing name");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A bare sentinel.
    #[error(transparent)]
    Sentinel(#[from] Sentinel),
    /// A sentinel with the failure that triggered it.
    #[error("{kind}: {source}")]
    Wrapped {
        /// Taxonomy tag.
        kind: Sentinel,
        /// Underlying failure.
        #[source]
        source: BoxedCause,
    },
    /// Failure reported by the transaction store.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Failure with an explicit HTTP status.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl DomainError {
    /// Tag `source` with a sentinel kind.
    pub fn wrap(kind: Sentinel, source: impl Into<BoxedCause>) -> Self {
        Self::Wrapped {
            kind,
            source: source.into(),
        }
    }

    /// [`Sentinel::Unknown`] carrying a textual description.
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::wrap(Sentinel::Unknown, detail.into())
    }

    /// [`Sentinel::FailedRollback`] wrapping the store failure.
    pub fn failed_rollback(source: StoreError) -> Self {
        Self::wrap(Sentinel::FailedRollback, source)
    }

    /// [`Sentinel::InvalidIp`] naming the rejected input.
    pub fn invalid_ip(input: &str) -> Self {
        Self::wrap(Sentinel::InvalidIp, format!("couldn't parse IP: {input}"))
    }

    /// 400 whose body is the sentinel's message.
    pub fn bad_request(kind: Sentinel) -> Self {
        Self::Http(HttpError::new(400, kind.to_string()).with_cause(kind))
    }

    /// 400 for a method the resource does not serve.
    pub fn bad_method() -> Self {
        Self::Http(HttpError::new(400, "Bad method"))
    }

    /// 403 with the canonical reason phrase.
    pub fn forbidden() -> Self {
        Self::Http(HttpError::new(403, ""))
    }

    /// The storage layer's "no rows" sentinel.
    pub fn not_found() -> Self {
        Self::Store(StoreError::not_found())
    }

    /// The sentinel this error is, or wraps.
    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Self::Sentinel(kind) | Self::Wrapped { kind, .. } => Some(*kind),
            Self::Http(http) => http.cause().and_then(Self::sentinel),
            Self::Store(_) => None,
        }
    }

    /// Whether this is the storage layer's "no rows" sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound))
    }
}
