use std::net::SocketAddr;

use anyhow::Context;

use vmsearch_gateway::{serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vmsearch_cli::init_tracing();

    let settings = vmsearch_cli::load_settings()?;
    let backend = vmsearch_cli::connect(&settings)?;
    let searcher = vmsearch_cli::searcher(&settings, backend);

    let addr: SocketAddr = format!("{}:{}", settings.gateway.host, settings.gateway.port)
        .parse()
        .with_context(|| format!("Invalid gateway address {}:{}", settings.gateway.host, settings.gateway.port))?;

    tracing::info!(
        "Starting vmsearch gateway v{} (engine {})",
        env!("CARGO_PKG_VERSION"),
        settings.engine.base_url()
    );
    serve(AppState::new(searcher, settings.gateway.expose_error_details), addr)
        .await
        .context("Gateway server failed")
}
