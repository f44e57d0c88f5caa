use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

use swm_admin::{
    auth::jwt::JwtService, bootstrap, config::AppConfig, routes, state::AppState,
    store::SledStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        data_dir = %config.data_dir.display(),
        serve_frontend = config.serve_frontend,
        serverless = config.serverless,
        cors_origins = config.frontend_origins.len(),
        "loaded configuration"
    );

    let store = Arc::new(SledStore::open(&config.data_dir)?);
    let report = bootstrap::initialize(store.as_ref(), &config).await?;
    tracing::info!(admin = ?report.admin, "bootstrap finished");

    if config.serverless {
        tracing::info!("serverless deployment detected, not binding a listener");
        return Ok(());
    }

    let jwt = JwtService::from_config(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("HOST and PORT must form a valid socket address")?;
    let state = AppState::new(store, config, jwt);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("received shutdown signal");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
