//! Short-name URL redirector: domain, HTTP pipeline and storage adapters.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

pub use middleware::Trace;
pub use settings::{AppSettings, SettingsError};
