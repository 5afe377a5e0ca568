use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::types::{CollectionInfo, CollectionSchema, Document, SearchRequest};

/// The narrow slice of the search service the core depends on.
///
/// `search` hands back the engine's raw response body; turning it into a
/// `SearchResultSet` is the normalizer's job so that contract violations are
/// caught in one place.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn health(&self) -> Result<bool, BackendError>;

    /// `Ok(None)` when the collection does not exist.
    async fn retrieve_collection(&self, name: &str) -> Result<Option<CollectionInfo>, BackendError>;

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionInfo, BackendError>;

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError>;

    async fn create_document(&self, collection: &str, document: &Document) -> Result<(), BackendError>;

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Value, BackendError>;
}
