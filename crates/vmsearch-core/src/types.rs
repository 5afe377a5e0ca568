//! Domain types shared by the engine client, the ingestion pipeline and the
//! query layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the collection every tool targets unless told otherwise.
pub const DEFAULT_COLLECTION: &str = "vm_search";

/// Fields every indexed document must carry, in schema order.
pub const REQUIRED_FIELDS: [&str; 7] = ["ID", "date", "slug", "type", "title", "status", "content"];

/// One article as stored in the index.
///
/// Field names on the wire follow the corpus format (`ID`, `type`); the Rust
/// names are adjusted where the corpus name is reserved or unidiomatic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    #[serde(rename = "ID")]
    pub id: i64,
    pub date: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: String,
    pub content: String,
}

impl Document {
    /// Primary key the engine enforces uniqueness on.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "string[]")]
    StringArray,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sort: bool,
}

impl FieldDescriptor {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self { name: name.to_string(), field_type, facet: false, sort: false }
    }

    pub fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sort = true;
        self
    }
}

/// Field layout of a collection. Serializes to the engine's create-collection body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sorting_field: Option<String>,
}

impl CollectionSchema {
    /// The article schema: `date` is the only facet (and therefore the only
    /// filterable field), `title` is the default sort.
    pub fn articles(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![
                FieldDescriptor::new("ID", FieldType::Int32),
                FieldDescriptor::new("date", FieldType::String).facet(),
                FieldDescriptor::new("slug", FieldType::String),
                FieldDescriptor::new("type", FieldType::String),
                FieldDescriptor::new("title", FieldType::String).sortable(),
                FieldDescriptor::new("status", FieldType::String),
                FieldDescriptor::new("content", FieldType::String),
            ],
            default_sorting_field: Some("title".to_string()),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn facetable_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.facet).map(|f| f.name.as_str())
    }

    /// Structural checks the engine would otherwise reject on create.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("collection name is empty".to_string());
        }
        if self.fields.is_empty() {
            return Err("schema declares no fields".to_string());
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(format!("field #{} has an empty name", i + 1));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("field '{}' is declared twice", field.name));
            }
        }
        if let Some(sort_field) = &self.default_sorting_field {
            match self.field(sort_field) {
                None => return Err(format!("default sorting field '{}' is not declared", sort_field)),
                Some(f) if !f.field_type.is_numeric() && !f.sort => {
                    return Err(format!("default sorting field '{}' must be numeric or marked sortable", sort_field))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// What the engine reports back about an existing collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    #[serde(default)]
    pub num_documents: u64,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One `field:order` term of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl SortClause {
    /// Pseudo-field the engine uses for relevance.
    pub const TEXT_MATCH: &'static str = "_text_match";

    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), order: SortOrder::Asc }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), order: SortOrder::Desc }
    }

    pub fn relevance() -> Self {
        Self::desc(Self::TEXT_MATCH)
    }
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{}:{}", self.field, order)
    }
}

/// A fully specified search call. Built by the query layer, executed by a
/// `SearchBackend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub query_by: Vec<String>,
    pub query_by_weights: Vec<u32>,
    pub filter_by: Option<String>,
    pub sort_by: Vec<SortClause>,
    pub facet_by: Vec<String>,
    pub highlight_full_fields: Vec<String>,
    pub highlight_affix_num_tokens: u32,
    pub highlight_start_tag: String,
    pub highlight_end_tag: String,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl SearchRequest {
    pub const MATCH_ALL: &'static str = "*";

    pub fn is_match_all(&self) -> bool {
        self.q.trim() == Self::MATCH_ALL
    }

    /// The `sort_by` value as sent on the wire.
    pub fn sort_spec(&self) -> String {
        self.sort_by.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }
}

/// A field-qualified highlighted excerpt of one hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightFragment {
    pub field: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub document: Document,
    pub highlights: Vec<HighlightFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub field: String,
    pub counts: Vec<FacetValueCount>,
}

/// Normalized outcome of one search, in engine order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub found: u64,
    pub search_time_ms: u64,
    pub page: u32,
    pub hits: Vec<Hit>,
    pub facets: Vec<FacetCounts>,
}

impl SearchResultSet {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_schema_is_valid_and_facets_date_only() {
        let schema = CollectionSchema::articles(DEFAULT_COLLECTION);
        assert_eq!(schema.validate(), Ok(()));
        assert_eq!(schema.facetable_fields().collect::<Vec<_>>(), vec!["date"]);
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, REQUIRED_FIELDS);
    }

    #[test]
    fn schema_serializes_to_engine_body() {
        let body = serde_json::to_value(CollectionSchema::articles("vm_search")).unwrap();
        assert_eq!(body["default_sorting_field"], "title");
        assert_eq!(body["fields"][0], serde_json::json!({"name": "ID", "type": "int32"}));
        assert_eq!(body["fields"][1]["facet"], true);
        assert_eq!(body["fields"][4]["sort"], true);
    }

    #[test]
    fn validate_rejects_unsortable_default_field() {
        let mut schema = CollectionSchema::articles("x");
        schema.default_sorting_field = Some("slug".into());
        assert!(schema.validate().unwrap_err().contains("slug"));
        schema.default_sorting_field = Some("missing".into());
        assert!(schema.validate().unwrap_err().contains("not declared"));
    }

    #[test]
    fn sort_spec_joins_clauses() {
        let clauses = [SortClause::relevance(), SortClause::asc("title")];
        let spec = clauses.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        assert_eq!(spec, "_text_match:desc,title:asc");
    }
}
