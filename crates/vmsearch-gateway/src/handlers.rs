use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::Uri,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vmsearch_core::config::SortMode;
use vmsearch_core::types::SearchResultSet;
use vmsearch_engine::PageRequest;

use crate::error::{ApiError, GatewayError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
}

/// Liveness of the gateway process itself; never touches the engine.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.uptime().as_secs(),
    })
}

pub async fn describe(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "VM Search API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "collection": state.searcher.collection(),
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "engine_health": "/api/engine/health",
            "search": "/api/search",
        },
    }))
}

pub async fn engine_health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.searcher.backend().health().await {
        Ok(true) => Ok(Json(json!({ "status": "OK", "engine": { "ok": true } }))),
        Ok(false) => Err(state.fail(GatewayError::EngineUnhealthy)),
        Err(e) => Err(state.fail(e)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub filter_by: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Comma-separated; replaces the configured facet fields for this call.
    pub facet_by: Option<String>,
    /// `relevance` or `title`; defaults to the configured mode.
    pub sort: Option<SortMode>,
}

#[derive(Debug, Serialize)]
pub struct SearchEnvelope {
    pub results: SearchResultSet,
    pub query: String,
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchEnvelope>, ApiError> {
    let Query(params) = params.map_err(|rejection| state.fail(GatewayError::BadRequest(rejection.body_text())))?;

    let mut builder = state.searcher.builder().clone();
    if let Some(sort) = params.sort {
        builder = builder.with_sort(sort);
    }
    let page = PageRequest { number: params.page, size: params.per_page };
    let mut request = builder.build(params.q.as_deref().unwrap_or_default(), params.filter_by.as_deref(), Some(page));
    if let Some(facets) = params.facet_by.as_deref() {
        request.facet_by = facets.split(',').map(str::trim).filter(|f| !f.is_empty()).map(str::to_string).collect();
    }

    let results = state.searcher.execute(&request).await.map_err(|e| state.fail(e))?;
    Ok(Json(SearchEnvelope { results, query: request.q }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(GatewayError::RouteNotFound(uri.path().to_string()), true)
}
