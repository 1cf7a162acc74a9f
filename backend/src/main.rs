//! Redirector entry-point: loads settings, opens the store and serves HTTP.

mod server;

use std::env;

use actix_web::web;
use color_eyre::eyre::{WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use urlredir::AppSettings;
use urlredir::inbound::http::debug_vars::{BuildInfo, DebugVars};
use urlredir::inbound::http::health::HealthState;
use urlredir::inbound::http::router::Pipeline;

use server::{ServerConfig, build_store, create_server, shutdown_on_signal};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.listen()?;
    let store = build_store(&settings).await?;
    let pipeline = Pipeline::new(store, settings.identity_source()?)
        .with_real_ip_header(settings.real_ip_header()?);
    let debug_vars = DebugVars::new(BuildInfo::from_build_env(), settings.debug_view());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(bind_addr, pipeline, debug_vars),
    )
    .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;

    actix_web::rt::spawn(shutdown_on_signal(server.handle(), health_state));
    server.await.wrap_err("server terminated abnormally")
}
