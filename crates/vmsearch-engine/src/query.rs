//! Turns a free-text query and an optional filter into a fully specified
//! `SearchRequest`.

use vmsearch_core::config::{QueryConfig, SortMode};
use vmsearch_core::types::{SearchRequest, SortClause};

/// Searched fields, most important first.
pub const SEARCH_FIELDS: [&str; 4] = ["title", "content", "type", "slug"];
/// Relevance weight per entry of `SEARCH_FIELDS`.
pub const SEARCH_WEIGHTS: [u32; 4] = [4, 2, 1, 1];
pub const HIGHLIGHT_FIELDS: [&str; 2] = ["title", "content"];
pub const SORT_FIELD: &str = "title";
pub const HIGHLIGHT_START_TAG: &str = "<mark>";
pub const HIGHLIGHT_END_TAG: &str = "</mark>";

/// Caller-chosen pagination. Unset parts fall back to the builder's policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based; 0 is treated as 1.
    pub number: Option<u32>,
    pub size: Option<u32>,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number: Some(number), size: Some(size) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    default_per_page: u32,
    max_per_page: u32,
    highlight_affix_num_tokens: u32,
    facet_by: Vec<String>,
    sort: SortMode,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            default_per_page: config.default_per_page.min(config.max_per_page).max(1),
            max_per_page: config.max_per_page.max(1),
            highlight_affix_num_tokens: config.highlight_affix_num_tokens,
            facet_by: config.facet_by.clone(),
            sort: config.sort,
        }
    }

    /// Request facet counts for these fields on every query. They must be
    /// facetable in the collection or the engine will refuse the search.
    pub fn with_facets<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facet_by = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn max_per_page(&self) -> u32 {
        self.max_per_page
    }

    /// Build the request. The filter is passed through untouched; its grammar
    /// is the engine's business.
    pub fn build(&self, free_text: &str, filter: Option<&str>, page: Option<PageRequest>) -> SearchRequest {
        let text = free_text.trim();
        let q = if text.is_empty() { SearchRequest::MATCH_ALL.to_string() } else { text.to_string() };
        let page = page.unwrap_or_default();

        let sort_by = match self.sort {
            SortMode::Relevance if q != SearchRequest::MATCH_ALL => {
                vec![SortClause::relevance(), SortClause::asc(SORT_FIELD)]
            }
            _ => vec![SortClause::asc(SORT_FIELD)],
        };

        SearchRequest {
            q,
            query_by: SEARCH_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            query_by_weights: SEARCH_WEIGHTS.to_vec(),
            filter_by: filter.map(str::trim).filter(|f| !f.is_empty()).map(str::to_string),
            sort_by,
            facet_by: self.facet_by.clone(),
            highlight_full_fields: HIGHLIGHT_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            highlight_affix_num_tokens: self.highlight_affix_num_tokens,
            highlight_start_tag: HIGHLIGHT_START_TAG.to_string(),
            highlight_end_tag: HIGHLIGHT_END_TAG.to_string(),
            page: page.number.unwrap_or(1).max(1),
            per_page: page.size.unwrap_or(self.default_per_page).clamp(1, self.max_per_page),
        }
    }

    /// Cheapest query that still reports the collection's document count.
    pub fn count_probe() -> SearchRequest {
        SearchRequest {
            q: SearchRequest::MATCH_ALL.to_string(),
            query_by: vec![SORT_FIELD.to_string()],
            query_by_weights: Vec::new(),
            filter_by: None,
            sort_by: Vec::new(),
            facet_by: Vec::new(),
            highlight_full_fields: Vec::new(),
            highlight_affix_num_tokens: 0,
            highlight_start_tag: HIGHLIGHT_START_TAG.to_string(),
            highlight_end_tag: HIGHLIGHT_END_TAG.to_string(),
            page: 1,
            per_page: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_defaults() {
        let request = QueryBuilder::new().build("", None, None);
        assert_eq!(request.q, "*");
        assert_eq!(request.per_page, 50);
        assert_eq!(request.page, 1);
        assert_eq!(request.sort_by, vec![SortClause::asc("title")]);
        assert_eq!(request.query_by, vec!["title", "content", "type", "slug"]);
        assert_eq!(request.highlight_full_fields, vec!["title", "content"]);
        assert_eq!(request.highlight_affix_num_tokens, 4);
        assert_eq!(request.filter_by, None);
    }

    #[test]
    fn title_carries_the_highest_weight() {
        let request = QueryBuilder::new().build("docker", None, None);
        let title = request.query_by.iter().position(|f| f == "title").unwrap();
        assert!(request.query_by_weights.iter().all(|w| *w <= request.query_by_weights[title]));
        assert!(request.query_by_weights[title] > request.query_by_weights[1]);
    }

    #[test]
    fn free_text_ranks_by_relevance_then_title() {
        let request = QueryBuilder::new().build("  docker  ", None, None);
        assert_eq!(request.q, "docker");
        assert_eq!(request.sort_spec(), "_text_match:desc,title:asc");
    }

    #[test]
    fn title_sort_mode_drops_relevance() {
        let builder = QueryBuilder::new().with_sort(SortMode::Title);
        assert_eq!(builder.build("docker", None, None).sort_spec(), "title:asc");
        assert_eq!(builder.build("*", None, None).sort_spec(), "title:asc");
    }

    #[test]
    fn filter_is_passed_verbatim() {
        let filter = "type:tutorial && status:published";
        let request = QueryBuilder::new().build("*", Some(filter), None);
        assert_eq!(request.filter_by.as_deref(), Some(filter));
        assert_eq!(QueryBuilder::new().build("*", Some("   "), None).filter_by, None);
    }

    #[test]
    fn page_size_is_capped_and_page_zero_clamped() {
        let request = QueryBuilder::new().build("*", None, Some(PageRequest::new(0, 10_000)));
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 250);
        let request = QueryBuilder::new().build("*", None, Some(PageRequest { number: Some(3), size: None }));
        assert_eq!(request.page, 3);
        assert_eq!(request.per_page, 50);
    }

    #[test]
    fn configured_facets_are_requested() {
        let request = QueryBuilder::new().with_facets(["date"]).build("*", None, None);
        assert_eq!(request.facet_by, vec!["date"]);
    }
}
