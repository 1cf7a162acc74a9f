//! `GET /debug/vars`: build metadata and effective configuration as JSON.

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use serde_json::Value;

const UNKNOWN_REVISION: &str = "unknown";
const UNKNOWN_REVISION_DATE: &str = "0001-01-01T00:00:00+00:00";

/// Revision the binary was built from, stamped at compile time through
/// `URLREDIR_GIT_REV` and `URLREDIR_REV_DATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Source revision.
    pub gitrev: &'static str,
    /// Commit date of `gitrev`.
    pub revdate: &'static str,
}

impl BuildInfo {
    /// Read the compile-time stamps, falling back to placeholders.
    pub fn from_build_env() -> Self {
        Self {
            gitrev: option_env!("URLREDIR_GIT_REV").unwrap_or(UNKNOWN_REVISION),
            revdate: option_env!("URLREDIR_REV_DATE").unwrap_or(UNKNOWN_REVISION_DATE),
        }
    }
}

/// Payload served by [`debug_vars`].
#[derive(Debug, Clone, Serialize)]
pub struct DebugVars {
    #[serde(flatten)]
    build: BuildInfo,
    config: Value,
}

impl DebugVars {
    /// Pair build metadata with an already redacted configuration view.
    pub fn new(build: BuildInfo, config: Value) -> Self {
        Self { build, config }
    }
}

/// Dump build and configuration details.
#[get("/debug/vars")]
pub async fn debug_vars(vars: web::Data<DebugVars>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(vars.get_ref())
}
