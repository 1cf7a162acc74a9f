//! Request pipeline interceptors.
//!
//! Each layer is an actix `Transform`/`Service` pair. The canonical order,
//! outermost first, is [`Recover`], [`Trace`], [`Transactional`], [`RealIp`]
//! then [`Identify`]; `inbound::http::router::configure` owns it.

pub mod identity;
pub mod real_ip;
pub mod recover;
pub mod trace;
pub mod transaction;

pub use identity::{Identify, IdentitySource};
pub use real_ip::{ClientAddr, ClientAddrSlot, RealIp};
pub use recover::Recover;
pub use trace::{Trace, TraceId};
pub use transaction::Transactional;
