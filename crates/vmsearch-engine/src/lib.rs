//! vmsearch-engine
//!
//! The parts with real behaviour: schema provisioning, the line-delimited
//! ingestion pipeline, query construction and response normalization. All of
//! it talks to the engine through `vmsearch_core::SearchBackend`; `memory`
//! provides an in-process backend for tests and dry runs.

pub mod ingest;
pub mod memory;
pub mod normalize;
pub mod query;
pub mod schema;
pub mod search;

pub use ingest::{AbortCause, IngestOptions, IngestionReport, Ingestor, LineOutcome};
pub use memory::MemoryBackend;
pub use normalize::normalize;
pub use query::{PageRequest, QueryBuilder};
pub use schema::{ProvisionOutcome, SchemaManager};
pub use search::Searcher;
