//! In-process `SearchBackend` that answers in the engine's wire format.
//!
//! It mirrors the behaviour the core relies on: collections keyed by name,
//! documents unique by `ID`, weighted token matching over `query_by`, filters
//! restricted to facet fields, `sort_by`, facet counts, highlights and
//! pagination. Relevance is a plain weighted token count, nothing more.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use vmsearch_core::error::BackendError;
use vmsearch_core::traits::SearchBackend;
use vmsearch_core::types::{
    CollectionInfo, CollectionSchema, Document, FieldType, SearchRequest, SortClause, SortOrder,
};

const MAX_PER_PAGE: u32 = 250;

#[derive(Default)]
pub struct MemoryBackend {
    collections: Mutex<HashMap<String, MemoryCollection>>,
    /// Forced rejections for specific document IDs.
    failures: Mutex<HashMap<i64, BackendError>>,
}

struct MemoryCollection {
    schema: CollectionSchema,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.schema.name.clone(),
            num_documents: self.documents.len() as u64,
            fields: self.schema.fields.clone(),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(schema: CollectionSchema) -> Self {
        let backend = Self::new();
        backend
            .collections
            .lock()
            .insert(schema.name.clone(), MemoryCollection { schema, documents: Vec::new() });
        backend
    }

    pub fn document_count(&self, collection: &str) -> Option<usize> {
        self.collections.lock().get(collection).map(|c| c.documents.len())
    }

    /// Make every submission of `id` fail with `error`.
    pub fn fail_document(&self, id: i64, error: BackendError) {
        self.failures.lock().insert(id, error);
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn health(&self) -> Result<bool, BackendError> {
        Ok(true)
    }

    async fn retrieve_collection(&self, name: &str) -> Result<Option<CollectionInfo>, BackendError> {
        Ok(self.collections.lock().get(name).map(MemoryCollection::info))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionInfo, BackendError> {
        schema.validate().map_err(|reason| BackendError::service(400, reason))?;
        let mut collections = self.collections.lock();
        if collections.contains_key(&schema.name) {
            return Err(BackendError::service(409, format!("A collection with name `{}` already exists.", schema.name)));
        }
        let collection = MemoryCollection { schema: schema.clone(), documents: Vec::new() };
        let info = collection.info();
        collections.insert(schema.name.clone(), collection);
        Ok(info)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError> {
        match self.collections.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(not_found(name)),
        }
    }

    async fn create_document(&self, collection: &str, document: &Document) -> Result<(), BackendError> {
        if let Some(error) = self.failures.lock().get(&document.id) {
            return Err(error.clone());
        }
        let mut collections = self.collections.lock();
        let target = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        if target.documents.iter().any(|d| d.id == document.id) {
            return Err(BackendError::service(409, format!("A document with id {} already exists.", document.id)));
        }
        target.documents.push(document.clone());
        Ok(())
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Value, BackendError> {
        let started = Instant::now();
        let collections = self.collections.lock();
        let target = collections.get(collection).ok_or_else(|| not_found(collection))?;
        let mut response = execute(target, request)?;
        response["search_time_ms"] = json!(started.elapsed().as_millis() as u64);
        Ok(response)
    }
}

fn not_found(collection: &str) -> BackendError {
    BackendError::service(404, format!("Collection `{}` not found.", collection))
}

fn bad_request(message: String) -> BackendError {
    BackendError::service(400, message)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum FieldValue<'a> {
    Int(i64),
    Str(&'a str),
}

fn field_value<'a>(document: &'a Document, field: &str) -> Option<FieldValue<'a>> {
    Some(match field {
        "ID" => FieldValue::Int(document.id),
        "date" => FieldValue::Str(&document.date),
        "slug" => FieldValue::Str(&document.slug),
        "type" => FieldValue::Str(&document.kind),
        "title" => FieldValue::Str(&document.title),
        "status" => FieldValue::Str(&document.status),
        "content" => FieldValue::Str(&document.content),
        _ => return None,
    })
}

fn field_text(document: &Document, field: &str) -> String {
    match field_value(document, field) {
        Some(FieldValue::Int(n)) => n.to_string(),
        Some(FieldValue::Str(s)) => s.to_string(),
        None => String::new(),
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase).collect()
}

fn token_matches(word: &str, query_tokens: &[String]) -> bool {
    let word = word.to_lowercase();
    query_tokens.iter().any(|q| word.starts_with(q.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug)]
enum Predicate {
    Compare { field: String, op: Op, value: String },
    Range { field: String, low: String, high: String },
    AnyOf { field: String, values: Vec<String> },
}

impl Predicate {
    fn field(&self) -> &str {
        match self {
            Self::Compare { field, .. } | Self::Range { field, .. } | Self::AnyOf { field, .. } => field,
        }
    }
}

fn parse_filter(filter: &str) -> Result<Vec<Predicate>, BackendError> {
    if filter.contains("||") {
        return Err(bad_request("Only `&&` conjunctions are supported in filter expressions.".to_string()));
    }
    filter.split("&&").map(str::trim).filter(|c| !c.is_empty()).map(parse_clause).collect()
}

fn parse_clause(clause: &str) -> Result<Predicate, BackendError> {
    let (field, expr) = clause
        .split_once(':')
        .ok_or_else(|| bad_request(format!("Could not parse the filter query: `{}`.", clause)))?;
    let field = field.trim().to_string();
    let expr = expr.trim();

    if let Some(inner) = expr.strip_prefix('[').and_then(|e| e.strip_suffix(']')) {
        if let Some((low, high)) = inner.split_once("..") {
            return Ok(Predicate::Range { field, low: unquote(low), high: unquote(high) });
        }
        let values = inner.split(',').map(unquote).collect();
        return Ok(Predicate::AnyOf { field, values });
    }

    let (op, value) = [(">=", Op::Ge), ("<=", Op::Le), ("!=", Op::Ne), (">", Op::Gt), ("<", Op::Lt), ("=", Op::Eq)]
        .iter()
        .find_map(|(prefix, op)| expr.strip_prefix(prefix).map(|rest| (*op, rest)))
        .unwrap_or((Op::Eq, expr));
    Ok(Predicate::Compare { field, op, value: unquote(value) })
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('`').to_string()
}

fn compare(document: &Document, field: &str, value: &str) -> Result<Ordering, BackendError> {
    match field_value(document, field) {
        Some(FieldValue::Int(n)) => {
            let wanted: i64 = value
                .parse()
                .map_err(|_| bad_request(format!("Value of filter field `{}` must be an integer.", field)))?;
            Ok(n.cmp(&wanted))
        }
        Some(FieldValue::Str(s)) => Ok(s.cmp(value)),
        None => Err(bad_request(format!("Cannot filter on `{}`.", field))),
    }
}

fn evaluate(document: &Document, predicate: &Predicate) -> Result<bool, BackendError> {
    Ok(match predicate {
        Predicate::Compare { field, op, value } => {
            let ord = compare(document, field, value)?;
            match op {
                Op::Eq => ord == Ordering::Equal,
                Op::Ne => ord != Ordering::Equal,
                Op::Gt => ord == Ordering::Greater,
                Op::Ge => ord != Ordering::Less,
                Op::Lt => ord == Ordering::Less,
                Op::Le => ord != Ordering::Greater,
            }
        }
        Predicate::Range { field, low, high } => {
            compare(document, field, low)? != Ordering::Less
                && compare(document, field, high)? != Ordering::Greater
        }
        Predicate::AnyOf { field, values } => {
            let mut any = false;
            for value in values {
                any |= compare(document, field, value)? == Ordering::Equal;
            }
            any
        }
    })
}

/// Check every field a request names against the collection schema.
fn check_request(schema: &CollectionSchema, request: &SearchRequest, filters: &[Predicate]) -> Result<(), BackendError> {
    if request.per_page > MAX_PER_PAGE {
        return Err(BackendError::service(422, format!("Only upto {} hits can be fetched per page.", MAX_PER_PAGE)));
    }
    for field in &request.query_by {
        match schema.field(field) {
            Some(f) if f.field_type == FieldType::String || f.field_type == FieldType::StringArray => {}
            Some(_) => return Err(bad_request(format!("Field `{}` should be a string or a string array.", field))),
            None => return Err(BackendError::service(404, format!("Could not find a field named `{}` in the schema.", field))),
        }
    }
    for predicate in filters {
        let field = predicate.field();
        match schema.field(field) {
            Some(f) if f.facet => {}
            Some(_) => {
                return Err(bad_request(format!(
                    "Cannot filter on field `{}`: only facet fields can be used in filter expressions.",
                    field
                )))
            }
            None => return Err(bad_request(format!("Could not find a filter field named `{}` in the schema.", field))),
        }
    }
    for field in &request.facet_by {
        if !schema.field(field).is_some_and(|f| f.facet) {
            return Err(bad_request(format!("Could not find a facet field named `{}` in the schema.", field)));
        }
    }
    for clause in &request.sort_by {
        if clause.field == SortClause::TEXT_MATCH {
            continue;
        }
        if !schema.field(&clause.field).is_some_and(|f| f.sort || f.field_type.is_numeric()) {
            return Err(bad_request(format!("Could not find a field named `{}` in the schema for sorting.", clause.field)));
        }
    }
    Ok(())
}

/// Weighted token score of `document`, or `None` when it does not match.
fn score(document: &Document, request: &SearchRequest, query_tokens: &[String], require_all: bool) -> Option<u64> {
    let field_tokens: Vec<Vec<String>> = request.query_by.iter().map(|f| tokens(&field_text(document, f))).collect();
    let mut total = 0u64;
    let mut matched = 0usize;
    for q in query_tokens {
        let best = request
            .query_by
            .iter()
            .enumerate()
            .filter(|(i, _)| field_tokens[*i].iter().any(|t| t.starts_with(q.as_str())))
            .map(|(i, _)| u64::from(request.query_by_weights.get(i).copied().unwrap_or(1)))
            .max();
        if let Some(weight) = best {
            total += weight;
            matched += 1;
        }
    }
    let hit = if require_all { matched == query_tokens.len() } else { matched > 0 };
    hit.then_some(total)
}

fn matching<'a>(
    candidates: &[&'a Document],
    request: &SearchRequest,
    query_tokens: &[String],
    require_all: bool,
) -> Vec<(&'a Document, u64)> {
    candidates
        .iter()
        .filter_map(|document| {
            if query_tokens.is_empty() {
                Some((*document, 0))
            } else {
                score(document, request, query_tokens, require_all).map(|s| (*document, s))
            }
        })
        .collect()
}

fn snippet(text: &str, query_tokens: &[String], request: &SearchRequest) -> Option<(String, Vec<String>)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let first = words.iter().position(|w| token_matches(w, query_tokens))?;
    let affix = request.highlight_affix_num_tokens as usize;
    let start = first.saturating_sub(affix);
    let end = (first + affix + 1).min(words.len());
    let mut matched = Vec::new();
    let marked: Vec<String> = words[start..end]
        .iter()
        .map(|w| {
            if token_matches(w, query_tokens) {
                matched.push((*w).to_string());
                format!("{}{}{}", request.highlight_start_tag, w, request.highlight_end_tag)
            } else {
                (*w).to_string()
            }
        })
        .collect();
    Some((marked.join(" "), matched))
}

fn hit_json(document: &Document, text_match: u64, request: &SearchRequest, query_tokens: &[String]) -> Value {
    let mut stored = serde_json::to_value(document).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut stored {
        map.insert("id".to_string(), Value::String(document.key()));
    }
    let highlights: Vec<Value> = if query_tokens.is_empty() {
        Vec::new()
    } else {
        request
            .query_by
            .iter()
            .filter_map(|field| {
                let (snippet, matched) = snippet(&field_text(document, field), query_tokens, request)?;
                Some(json!({"field": field, "snippet": snippet, "matched_tokens": matched}))
            })
            .collect()
    };
    json!({"document": stored, "highlights": highlights, "text_match": text_match})
}

fn facet_json(matches: &[(&Document, u64)], field: &str) -> Value {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for (document, _) in matches {
        let value = field_text(document, field);
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total_values = counts.len();
    let counts: Vec<Value> = counts
        .into_iter()
        .map(|(value, count)| json!({"value": value, "count": count, "highlighted": value}))
        .collect();
    json!({"field_name": field, "counts": counts, "stats": {"total_values": total_values}})
}

fn execute(collection: &MemoryCollection, request: &SearchRequest) -> Result<Value, BackendError> {
    let schema = &collection.schema;
    let filters = match request.filter_by.as_deref() {
        Some(filter) if !filter.trim().is_empty() => parse_filter(filter)?,
        _ => Vec::new(),
    };
    check_request(schema, request, &filters)?;

    let query_tokens = if request.is_match_all() { Vec::new() } else { tokens(&request.q) };

    let mut candidates = Vec::new();
    for document in &collection.documents {
        let mut keep = true;
        for predicate in &filters {
            keep &= evaluate(document, predicate)?;
        }
        if keep {
            candidates.push(document);
        }
    }

    let mut matches = matching(&candidates, request, &query_tokens, true);
    if matches.is_empty() && query_tokens.len() > 1 {
        matches = matching(&candidates, request, &query_tokens, false);
    }

    matches.sort_by(|(a, sa), (b, sb)| {
        request.sort_by.iter().fold(Ordering::Equal, |acc, clause| {
            acc.then_with(|| {
                let ord = if clause.field == SortClause::TEXT_MATCH {
                    sa.cmp(sb)
                } else {
                    field_value(a, &clause.field).cmp(&field_value(b, &clause.field))
                };
                match clause.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            })
        })
    });

    let page = request.page.max(1);
    let per_page = request.per_page as usize;
    let start = (page as usize - 1).saturating_mul(per_page);
    let hits: Vec<Value> = matches
        .iter()
        .skip(start)
        .take(per_page)
        .map(|(document, text_match)| hit_json(document, *text_match, request, &query_tokens))
        .collect();

    let mut response = Map::new();
    response.insert("found".into(), json!(matches.len()));
    response.insert("out_of".into(), json!(collection.documents.len()));
    response.insert("page".into(), json!(page));
    response.insert("hits".into(), Value::Array(hits));
    if !request.facet_by.is_empty() {
        let facets: Vec<Value> = request.facet_by.iter().map(|f| facet_json(&matches, f)).collect();
        response.insert("facet_counts".into(), Value::Array(facets));
    }
    response.insert("request_params".into(), json!({"q": request.q, "per_page": request.per_page}));
    Ok(Value::Object(response))
}
