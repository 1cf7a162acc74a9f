//! HTTP inbound adapter: handlers, request context and error rendering.

pub mod admin;
pub mod admin_page;
pub mod cache_control;
pub mod context;
pub mod debug_vars;
pub mod error;
pub mod health;
pub mod links;
pub mod outcome;
pub mod router;
#[cfg(test)]
pub mod test_utils;

pub use context::{RequestContext, TxHandle};
pub use outcome::{Outcome, TxDirective};
