//! Maps the engine's raw search response onto `SearchResultSet`.

use serde::Deserialize;
use serde_json::{Map, Value};

use vmsearch_core::error::NormalizeError;
use vmsearch_core::types::{
    Document, FacetCounts, FacetValueCount, HighlightFragment, Hit, SearchResultSet,
};

#[derive(Deserialize)]
struct RawResponse {
    found: u64,
    #[serde(default)]
    search_time_ms: u64,
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    hits: Vec<RawHit>,
    #[serde(default)]
    facet_counts: Vec<RawFacet>,
}

#[derive(Deserialize)]
struct RawHit {
    document: Document,
    #[serde(default)]
    highlights: Vec<RawHighlight>,
    /// Newer engines nest highlights per field instead.
    #[serde(default)]
    highlight: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawHighlight {
    field: String,
    snippet: Option<String>,
    #[serde(default)]
    snippets: Vec<String>,
}

#[derive(Deserialize)]
struct RawFacet {
    field_name: String,
    #[serde(default)]
    counts: Vec<RawFacetCount>,
}

#[derive(Deserialize)]
struct RawFacetCount {
    value: String,
    count: u64,
}

fn first_page() -> u32 {
    1
}

/// Normalize a raw response. Engine order of hits and facet values is kept;
/// an empty result is a valid, empty set.
pub fn normalize(raw: Value) -> Result<SearchResultSet, NormalizeError> {
    let raw: RawResponse = serde_json::from_value(raw).map_err(|e| NormalizeError::Shape(e.to_string()))?;

    let hits = raw
        .hits
        .into_iter()
        .map(|hit| {
            let highlights = if hit.highlights.is_empty() {
                nested_highlights(&hit.highlight)
            } else {
                hit.highlights.into_iter().filter_map(flat_highlight).collect()
            };
            Hit { document: hit.document, highlights }
        })
        .collect();

    let facets = raw
        .facet_counts
        .into_iter()
        .map(|facet| FacetCounts {
            field: facet.field_name,
            counts: facet
                .counts
                .into_iter()
                .map(|c| FacetValueCount { value: c.value, count: c.count })
                .collect(),
        })
        .collect();

    Ok(SearchResultSet { found: raw.found, search_time_ms: raw.search_time_ms, page: raw.page, hits, facets })
}

fn flat_highlight(raw: RawHighlight) -> Option<HighlightFragment> {
    let snippet = raw.snippet.or_else(|| raw.snippets.into_iter().next())?;
    Some(HighlightFragment { field: raw.field, snippet })
}

fn nested_highlights(nested: &Map<String, Value>) -> Vec<HighlightFragment> {
    nested
        .iter()
        .filter_map(|(field, entry)| {
            let snippet = entry.get("snippet").and_then(Value::as_str)?;
            Some(HighlightFragment { field: field.clone(), snippet: snippet.to_string() })
        })
        .collect()
}
