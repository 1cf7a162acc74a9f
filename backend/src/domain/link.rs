//! Short link model: names, targets, hit metadata.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, Utc};
use url::Url;

use super::{DomainError, UserName};

const RELATIVE_BASE: &str = "http://localhost/";

/// Validation errors raised by the link constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkValidationError {
    /// The short name is empty.
    #[error("short name must not be empty")]
    EmptyName,
    /// The target URL is empty.
    #[error("target URL must not be empty")]
    EmptyUrl,
    /// The target URL does not parse.
    #[error("target URL is malformed: {reason}")]
    MalformedUrl {
        /// Parser diagnostic.
        reason: String,
    },
}

/// Unique key a client requests to be redirected.
///
/// Everything after the leading `/` of the request path, so it may itself
/// contain slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortName(String);

impl ShortName {
    /// Validate and wrap a short name.
    pub fn new(raw: impl Into<String>) -> Result<Self, LinkValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(LinkValidationError::EmptyName);
        }
        Ok(Self(raw))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Redirect destination.
///
/// The URL is kept exactly as submitted so the `Location` header matches what
/// the owner registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(String);

impl TargetUrl {
    /// Parse a submitted URL, rejecting empty and malformed input.
    ///
    /// Relative references are accepted as long as they resolve against a
    /// base; a colon in the first path segment is rejected since it would read
    /// as a scheme.
    ///
    /// # Examples
    /// ```
    /// use urlredir::domain::TargetUrl;
    ///
    /// assert!(TargetUrl::parse("http://example.com").is_ok());
    /// assert!(TargetUrl::parse("example.com").is_ok());
    /// assert!(TargetUrl::parse(":foo/bar").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, LinkValidationError> {
        if raw.is_empty() {
            return Err(LinkValidationError::EmptyUrl);
        }
        match Url::parse(raw) {
            Ok(_) => {}
            Err(url::ParseError::RelativeUrlWithoutBase) => check_relative(raw)?,
            Err(err) => return Err(malformed(err)),
        }
        Ok(Self(raw.to_owned()))
    }

    /// Rehydrate a URL previously accepted by [`TargetUrl::parse`].
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn malformed(err: impl fmt::Display) -> LinkValidationError {
    LinkValidationError::MalformedUrl {
        reason: err.to_string(),
    }
}

fn check_relative(raw: &str) -> Result<(), LinkValidationError> {
    let first_segment = raw.split(['/', '?', '#']).next().unwrap_or_default();
    if first_segment.contains(':') {
        return Err(malformed("first path segment contains a colon"));
    }
    let base = Url::parse(RELATIVE_BASE).map_err(malformed)?;
    base.join(raw).map(drop).map_err(malformed)
}

/// Store-assigned identifier of a short link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub i64);

/// Validated input for creating a short link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    /// Unique short name.
    pub name: ShortName,
    /// Redirect destination.
    pub target: TargetUrl,
    /// Owning user.
    pub owner: UserName,
}

/// One row of a user's link listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    /// Short name.
    pub name: ShortName,
    /// Redirect destination.
    pub target: TargetUrl,
    /// Number of redirects served so far.
    pub hits: i64,
}

/// Full stored state of a short link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Store identifier.
    pub id: LinkId,
    /// Short name.
    pub name: ShortName,
    /// Redirect destination.
    pub target: TargetUrl,
    /// Owning user.
    pub owner: UserName,
    /// Number of redirects served so far.
    pub hits: i64,
}

/// Visit metadata recorded after a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHit {
    /// Link that was followed.
    pub link: LinkId,
    /// Client address.
    pub remote: IpAddr,
    /// `User-Agent` header, empty when absent.
    pub user_agent: String,
    /// `Referer` header, when present and non-empty.
    pub referrer: Option<String>,
}

/// A recorded visit. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    /// Visit metadata.
    pub hit: NewHit,
    /// When the visit was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Parse a remote address in `host:port` or bare host form.
///
/// Failure maps to [`super::Sentinel::InvalidIp`]; the address comes from
/// the server or a trusted proxy, so a bad value is an internal fault.
///
/// # Examples
/// ```
/// use urlredir::domain::parse_remote_ip;
///
/// assert!(parse_remote_ip("127.0.0.1:4711").is_ok());
/// assert!(parse_remote_ip("::1").is_ok());
/// assert!(parse_remote_ip("foo").is_err());
/// ```
pub fn parse_remote_ip(raw: &str) -> Result<IpAddr, DomainError> {
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr.ip());
    }
    let host = raw
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(raw);
    host.parse::<IpAddr>()
        .map_err(|_| DomainError::invalid_ip(raw))
}
