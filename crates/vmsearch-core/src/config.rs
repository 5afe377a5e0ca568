//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested with `__`) + the legacy `TYPESENSE_*` variables.
//! `expand_path` expands `~` and `${VAR}` in user-supplied paths.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::DEFAULT_COLLECTION;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl EngineConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8108,
            protocol: Protocol::Http,
            api_key: "xyz".to_string(),
            timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self { name: DEFAULT_COLLECTION.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// In-flight submissions; 1 submits strictly one after another.
    pub concurrency: usize,
    /// How many rejections the summary spells out.
    pub error_details: usize,
    /// Characters of a rejected line kept in the report.
    pub preview_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { concurrency: 1, error_details: 5, preview_chars: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
    pub highlight_affix_num_tokens: u32,
    pub facet_by: Vec<String>,
    #[serde(default)]
    pub sort: SortMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: 50,
            max_per_page: 250,
            highlight_affix_num_tokens: 4,
            facet_by: Vec::new(),
            sort: SortMode::default(),
        }
    }
}

/// Ordering of free-text results. Match-all queries sort by title either way.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Text relevance, then title.
    #[default]
    Relevance,
    /// Title ascending only.
    Title,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort mode '{}' (expected relevance or title)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Put the underlying error text in 500 envelopes.
    pub expose_error_details: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3001, expose_error_details: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::InvalidConfig(msg.to_string()));
        if self.engine.host.trim().is_empty() {
            return invalid("engine.host must not be empty");
        }
        if self.collection.name.trim().is_empty() {
            return invalid("collection.name must not be empty");
        }
        if self.ingest.concurrency == 0 {
            return invalid("ingest.concurrency must be at least 1");
        }
        if self.query.default_per_page == 0 || self.query.max_per_page == 0 {
            return invalid("query page sizes must be at least 1");
        }
        if self.query.default_per_page > self.query.max_per_page {
            return invalid("query.default_per_page exceeds query.max_per_page");
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for_env(None)
    }

    pub fn load_for_env(env_name: Option<&str>) -> Result<Self, ConfigError> {
        let env_name = env_name
            .map(str::to_string)
            .unwrap_or_else(|| env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string()));

        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if matches!(env_name.as_str(), "prod" | "production") {
            figment = figment.merge(Serialized::default("gateway.expose_error_details", false));
        }
        figment = figment.merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::prefixed("TYPESENSE_").map(|key| format!("engine.{}", key.as_str().to_lowercase()).into()));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(self.figment.extract()?)
    }
}

/// Expand `$VAR`/`${VAR}` and a leading `~` in a corpus path given on the
/// command line. Unknown variables leave the input as typed; nothing is
/// canonicalized.
pub fn expand_path<S: AsRef<str>>(raw: S) -> PathBuf {
    let raw = raw.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).as_ref())
}
