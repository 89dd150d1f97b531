//! snomedix web server
//!
//! Run with: cargo run -p snomedix-web --bin snomedix

use anyhow::Context;
use snomedix_link::LinkingService;
use snomedix_web::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snomedix=debug,info")),
        )
        .init();

    info!("Starting snomedix...");
    let config = Config::load()?;

    let service = LinkingService::load(config.service_config())
        .await
        .context("Loading linking service")?;
    let state = snomedix_web::state::AppState::new(service);
    let app = snomedix_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Binding {}:{}", config.server.host, config.server.port))?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
