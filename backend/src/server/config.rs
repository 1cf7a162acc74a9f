//! HTTP server configuration object.

use std::net::SocketAddr;

use urlredir::inbound::http::debug_vars::DebugVars;
use urlredir::inbound::http::router::Pipeline;

/// Everything the server needs beyond its health state.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) pipeline: Pipeline,
    pub(crate) debug_vars: DebugVars,
}

impl ServerConfig {
    /// Serve `pipeline` on `bind_addr`, publishing `debug_vars`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, pipeline: Pipeline, debug_vars: DebugVars) -> Self {
        Self {
            bind_addr,
            pipeline,
            debug_vars,
        }
    }
}
