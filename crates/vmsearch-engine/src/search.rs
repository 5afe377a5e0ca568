use std::sync::Arc;

use tracing::debug;

use vmsearch_core::error::SearchError;
use vmsearch_core::traits::SearchBackend;
use vmsearch_core::types::{SearchRequest, SearchResultSet};

use crate::normalize::normalize;
use crate::query::{PageRequest, QueryBuilder};

/// Build, execute, normalize. Stateless per call; share freely across tasks.
#[derive(Clone)]
pub struct Searcher {
    backend: Arc<dyn SearchBackend>,
    builder: QueryBuilder,
    collection: String,
}

impl Searcher {
    pub fn new(backend: Arc<dyn SearchBackend>, collection: &str, builder: QueryBuilder) -> Self {
        Self { backend, builder, collection: collection.to_string() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub async fn search(
        &self,
        free_text: &str,
        filter: Option<&str>,
        page: Option<PageRequest>,
    ) -> Result<SearchResultSet, SearchError> {
        let request = self.builder.build(free_text, filter, page);
        self.execute(&request).await
    }

    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchResultSet, SearchError> {
        debug!(
            collection = %self.collection,
            q = %request.q,
            filter = request.filter_by.as_deref().unwrap_or(""),
            page = request.page,
            per_page = request.per_page,
            "Searching"
        );
        let raw = self.backend.search(&self.collection, request).await?;
        Ok(normalize(raw)?)
    }
}
