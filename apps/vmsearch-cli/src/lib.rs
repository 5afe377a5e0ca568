//! Shared plumbing for the `vmsearch` and `vmsearch-gateway` binaries.

pub mod output;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmsearch_core::config::{Config, Settings};
use vmsearch_core::traits::SearchBackend;
use vmsearch_engine::{QueryBuilder, Searcher};
use vmsearch_typesense::TypesenseClient;

pub const DEFAULT_LOG_FILTER: &str = "vmsearch=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let config = Config::load().context("Error loading config")?;
    Ok(config.settings()?)
}

pub fn connect(settings: &Settings) -> anyhow::Result<Arc<dyn SearchBackend>> {
    let client = TypesenseClient::new(&settings.engine)
        .with_context(|| format!("Cannot build engine client for {}", settings.engine.base_url()))?;
    Ok(Arc::new(client))
}

pub fn searcher(settings: &Settings, backend: Arc<dyn SearchBackend>) -> Searcher {
    Searcher::new(backend, &settings.collection.name, QueryBuilder::from_config(&settings.query))
}
