//! Server construction, store selection and shutdown.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServerHandle, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

use urlredir::AppSettings;
use urlredir::domain::ports::TransactionStore;
use urlredir::inbound::http::debug_vars::{DebugVars, debug_vars};
use urlredir::inbound::http::health::{HealthState, live, ready};
use urlredir::inbound::http::router::{Pipeline, configure};
use urlredir::outbound::InMemoryTransactionStore;
use urlredir::outbound::persistence::{
    DbPool, DieselTransactionStore, PoolConfig, apply_migrations,
};

/// Open the configured store.
///
/// Migrates and pools PostgreSQL when a connection string is set; otherwise
/// falls back to a process-local store whose contents die with the process.
pub async fn build_store(settings: &AppSettings) -> color_eyre::Result<Arc<dyn TransactionStore>> {
    let Some(conninfo) = settings.db_conninfo() else {
        warn!("no database configured; using in-memory store");
        return Ok(Arc::new(InMemoryTransactionStore::default()));
    };
    let schema = settings.db_schema()?;
    apply_migrations(conninfo, schema.as_ref()).await?;
    let pool = DbPool::new(
        PoolConfig::new(conninfo)
            .with_max_size(settings.db_max_connections())
            .with_schema(schema),
    )
    .await?;
    info!(
        schema = pool.schema().map(|s| s.as_str()).unwrap_or("default"),
        max_connections = settings.db_max_connections(),
        "database ready"
    );
    Ok(Arc::new(DieselTransactionStore::new(pool)))
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    debug_vars: web::Data<DebugVars>,
    pipeline: Pipeline,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        debug_vars: vars,
        pipeline,
    } = deps;

    // Probes and debug routes come first; the redirect route matches any path.
    App::new()
        .app_data(health_state)
        .app_data(vars)
        .service(ready)
        .service(live)
        .service(debug_vars)
        .configure(configure(pipeline))
}

/// Bind the HTTP server and flip readiness once it is listening.
///
/// Signal handling is left to [`shutdown_on_signal`].
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        pipeline,
        debug_vars: vars,
    } = config;
    let deps = AppDependencies {
        health_state: health_state.clone(),
        debug_vars: web::Data::new(vars),
        pipeline,
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .disable_signals()
        .bind(bind_addr)?
        .run();

    info!(%bind_addr, "listening");
    health_state.mark_ready();
    Ok(server)
}

/// Wait for SIGINT or SIGTERM, then drop out of the probes and drain
/// in-flight requests.
pub async fn shutdown_on_signal(handle: ServerHandle, health_state: web::Data<HealthState>) {
    let signal = wait_for_signal().await;
    info!(signal, "shutting down");
    health_state.mark_unhealthy();
    handle.stop(true).await;
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            return wait_for_interrupt().await;
        }
    };
    tokio::select! {
        name = wait_for_interrupt() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_interrupt().await
}

async fn wait_for_interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
