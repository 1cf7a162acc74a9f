//! Shared cache-control policies for HTTP handlers.

use std::time::{Duration, SystemTime};

use actix_web::http::header::{self, HttpDate};

/// How long clients may reuse a redirect.
pub const REDIRECT_MAX_AGE: Duration = Duration::from_secs(90);

/// Redirects are cached privately for [`REDIRECT_MAX_AGE`].
pub const PRIVATE_REDIRECT: &str = "private, max-age=90";

/// Pages rendered per user must always be revalidated before reuse.
pub const PRIVATE_NO_CACHE_MUST_REVALIDATE: &str = "private, no-cache, must-revalidate";

/// Build the cache-control header tuple for redirect responses.
pub const fn private_redirect_header() -> (&'static str, &'static str) {
    ("Cache-Control", PRIVATE_REDIRECT)
}

/// Build the standard cache-control header tuple for private pages.
pub const fn private_no_cache_header() -> (&'static str, &'static str) {
    ("Cache-Control", PRIVATE_NO_CACHE_MUST_REVALIDATE)
}

/// `Expires` header matching [`PRIVATE_REDIRECT`] for a response sent at `now`.
pub fn redirect_expires(now: SystemTime) -> header::Expires {
    header::Expires(HttpDate::from(now + REDIRECT_MAX_AGE))
}
