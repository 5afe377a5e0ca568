//! vmsearch-core
//!
//! Domain types, error taxonomy and the narrow `SearchBackend` interface shared
//! by the engine client, the ingestion pipeline and the query layer.

pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use error::{BackendError, ConfigError, IngestError, NormalizeError, SchemaError, SearchError};
pub use traits::SearchBackend;
pub use types::{CollectionInfo, CollectionSchema, Document, FieldDescriptor, FieldType};
