//! Inbound adapters that translate HTTP requests into store operations while
//! keeping framework details at the edge.
//!
//! Handlers, the request context and error rendering live under [`http`];
//! the interceptors that wrap them live in [`crate::middleware`].

pub mod http;
