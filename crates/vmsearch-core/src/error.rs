use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a `SearchBackend` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced a response (connect, timeout, TLS, body decode).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Service rejected request ({status}): {message}")]
    Service { status: u16, message: String },
}

impl BackendError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service { status, message: message.into() }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// The service's own explanation, without the status prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Service { message, .. } => message,
            Self::Transport(message) => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema for collection '{collection}': {reason}")]
    InvalidSchema { collection: String, reason: String },

    #[error("Failed to look up collection '{collection}': {source}")]
    Lookup {
        collection: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to delete collection '{collection}': {source}")]
    Delete {
        collection: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to create collection '{collection}': {source}")]
    Create {
        collection: String,
        #[source]
        source: BackendError,
    },
}

/// Precondition failures of an ingestion run. Per-line problems never appear
/// here; they are recorded in the report.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Collection '{0}' does not exist. Please create it first.")]
    CollectionMissing(String),

    #[error("Failed to look up collection '{collection}': {source}")]
    Lookup {
        collection: String,
        #[source]
        source: BackendError,
    },
}

/// The engine answered, but not in the documented response shape.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Unexpected search response shape: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
