//! Domain primitives, failure taxonomy and ports.
//!
//! Purpose: define strongly typed values for short links and the identities
//! that own them, the closed set of failures handlers may report, and the
//! storage port the request pipeline drives. Nothing here depends on the
//! HTTP framework; inbound adapters translate these types at the edge.
//!
//! Public surface:
//! - [`DomainError`], [`HttpError`], [`Sentinel`] — failure taxonomy.
//! - [`ShortName`], [`TargetUrl`], [`LinkId`], [`NewLink`], [`LinkSummary`],
//!   [`NewHit`], [`LinkRecord`], [`HitRecord`] — short link model.
//! - [`UserName`], [`Identity`] — who is acting on a request.
//! - [`ports`] — the `TransactionStore` capability.

pub mod error;
pub mod identity;
pub mod link;
pub mod ports;

pub use self::error::{DomainError, HttpError, Sentinel};
pub use self::identity::{Identity, UserName};
pub use self::link::{
    HitRecord, LinkId, LinkRecord, LinkSummary, LinkValidationError, NewHit, NewLink, ShortName,
    TargetUrl, parse_remote_ip,
};
