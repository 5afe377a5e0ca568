//! HTTP client for the engine.
//!
//! | operation            | request                                      |
//! |----------------------|----------------------------------------------|
//! | health               | `GET /health`                                |
//! | retrieve_collection  | `GET /collections/{name}`                    |
//! | create_collection    | `POST /collections`                          |
//! | delete_collection    | `DELETE /collections/{name}`                 |
//! | create_document      | `POST /collections/{name}/documents`         |
//! | search               | `GET /collections/{name}/documents/search`   |

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use vmsearch_core::config::EngineConfig;
use vmsearch_core::error::BackendError;
use vmsearch_core::traits::SearchBackend;
use vmsearch_core::types::{CollectionInfo, CollectionSchema, Document, SearchRequest};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

#[derive(Clone)]
pub struct TypesenseClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

/// Body of a document submission: the corpus fields plus the engine's primary key.
#[derive(Serialize)]
struct DocumentPayload<'a> {
    id: String,
    #[serde(flatten)]
    document: &'a Document,
}

#[derive(Deserialize)]
struct HealthBody {
    ok: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl TypesenseClient {
    pub fn new(config: &EngineConfig) -> Result<Self, BackendError> {
        Self::with_base_url(&config.base_url(), &config.api_key, Some(config.timeout()))
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        timeout: Option<std::time::Duration>,
    ) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("Invalid engine URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!("Invalid engine URL '{}'", base_url)));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, base_url, api_key: api_key.to_string() })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.url(segments)).header(API_KEY_HEADER, &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Engine request failed");
            BackendError::Transport(e.to_string())
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
        debug!(status = status.as_u16(), message = %message, "Engine rejected request");
        Err(BackendError::service(status.as_u16(), message))
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        response.json::<T>().await.map_err(|e| BackendError::Transport(format!("Failed to decode response: {}", e)))
    }
}

/// Flatten a request into the engine's query-string parameters.
pub fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", request.q.clone()),
        ("query_by", request.query_by.join(",")),
    ];
    if !request.query_by_weights.is_empty() {
        let weights: Vec<String> = request.query_by_weights.iter().map(ToString::to_string).collect();
        params.push(("query_by_weights", weights.join(",")));
    }
    if let Some(filter) = request.filter_by.as_deref().filter(|f| !f.trim().is_empty()) {
        params.push(("filter_by", filter.to_string()));
    }
    if !request.sort_by.is_empty() {
        params.push(("sort_by", request.sort_spec()));
    }
    if !request.facet_by.is_empty() {
        params.push(("facet_by", request.facet_by.join(",")));
    }
    if !request.highlight_full_fields.is_empty() {
        params.push(("highlight_full_fields", request.highlight_full_fields.join(",")));
    }
    params.push(("highlight_affix_num_tokens", request.highlight_affix_num_tokens.to_string()));
    params.push(("highlight_start_tag", request.highlight_start_tag.clone()));
    params.push(("highlight_end_tag", request.highlight_end_tag.clone()));
    params.push(("page", request.page.to_string()));
    params.push(("per_page", request.per_page.to_string()));
    params
}

#[async_trait]
impl SearchBackend for TypesenseClient {
    async fn health(&self) -> Result<bool, BackendError> {
        let response = self.send(self.request(Method::GET, &["health"])).await?;
        Ok(Self::json::<HealthBody>(response).await?.ok)
    }

    async fn retrieve_collection(&self, name: &str) -> Result<Option<CollectionInfo>, BackendError> {
        match self.send(self.request(Method::GET, &["collections", name])).await {
            Ok(response) => Ok(Some(Self::json(response).await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionInfo, BackendError> {
        let response = self.send(self.request(Method::POST, &["collections"]).json(schema)).await?;
        Self::json(response).await
    }

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError> {
        self.send(self.request(Method::DELETE, &["collections", name])).await?;
        Ok(())
    }

    async fn create_document(&self, collection: &str, document: &Document) -> Result<(), BackendError> {
        let payload = DocumentPayload { id: document.key(), document };
        self.send(self.request(Method::POST, &["collections", collection, "documents"]).json(&payload))
            .await?;
        Ok(())
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Value, BackendError> {
        let params = search_params(request);
        let response = self
            .send(self.request(Method::GET, &["collections", collection, "documents", "search"]).query(&params))
            .await?;
        Self::json(response).await
    }
}
