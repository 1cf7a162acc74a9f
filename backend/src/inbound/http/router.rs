//! Route table and middleware order for the redirector.

use std::sync::Arc;

use actix_web::http::header::HeaderName;
use actix_web::web;

use crate::domain::DomainError;
use crate::domain::ports::TransactionStore;
use crate::middleware::{Identify, IdentitySource, RealIp, Recover, Trace, Transactional};

use super::admin::{self, ADMIN_PATH};
use super::{Outcome, links};

/// Dependencies the request pipeline is built from.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn TransactionStore>,
    identity: IdentitySource,
    real_ip_header: Option<HeaderName>,
}

impl Pipeline {
    /// Pipeline over `store` identifying users from `identity`.
    pub fn new(store: Arc<dyn TransactionStore>, identity: IdentitySource) -> Self {
        Self {
            store,
            identity,
            real_ip_header: None,
        }
    }

    /// Trust `header` for the client address.
    #[must_use]
    pub fn with_real_ip_header(mut self, header: Option<HeaderName>) -> Self {
        self.real_ip_header = header;
        self
    }
}

async fn bad_method() -> Outcome {
    Outcome::Rollback(DomainError::bad_method())
}

/// Register the admin and redirect routes behind the canonical chain:
/// recovery, logging, transaction, client address, identity.
///
/// Register any other service on the app first: `/{name:.*}` matches
/// every path.
pub fn configure(pipeline: Pipeline) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let scope = web::scope("")
            .service(
                web::resource(ADMIN_PATH)
                    .route(web::get().to(admin::list))
                    .route(web::post().to(admin::add))
                    .default_service(web::to(bad_method)),
            )
            .service(
                web::resource("/{name:.*}")
                    .route(web::get().to(links::redirect))
                    .route(web::delete().to(links::delete))
                    .default_service(web::to(bad_method)),
            )
            .wrap(Identify::new(pipeline.identity))
            .wrap(RealIp::new(pipeline.real_ip_header))
            .wrap(Transactional::new(pipeline.store))
            .wrap(Trace)
            .wrap(Recover);
        cfg.service(scope);
    }
}
