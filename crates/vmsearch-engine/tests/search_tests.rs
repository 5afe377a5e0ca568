use std::sync::Arc;

use vmsearch_core::error::SearchError;
use vmsearch_core::traits::SearchBackend;
use vmsearch_core::types::{CollectionSchema, Document, DEFAULT_COLLECTION};
use vmsearch_engine::{MemoryBackend, PageRequest, QueryBuilder, Searcher};

fn doc(id: i64, date: &str, kind: &str, title: &str, content: &str) -> Document {
    Document {
        id,
        date: date.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        kind: kind.to_string(),
        title: title.to_string(),
        status: "published".to_string(),
        content: content.to_string(),
    }
}

async fn seeded(documents: Vec<Document>) -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::with_collection(CollectionSchema::articles(DEFAULT_COLLECTION)));
    for document in &documents {
        backend.create_document(DEFAULT_COLLECTION, document).await.unwrap();
    }
    backend
}

fn searcher(backend: &Arc<MemoryBackend>, builder: QueryBuilder) -> Searcher {
    Searcher::new(backend.clone(), DEFAULT_COLLECTION, builder)
}

fn titles(set: &vmsearch_core::types::SearchResultSet) -> Vec<&str> {
    set.hits.iter().map(|h| h.document.title.as_str()).collect()
}

#[tokio::test]
async fn title_match_outranks_passing_mention() {
    let backend = seeded(vec![
        doc(1, "2023-02-01", "note", "Shipping Containers", "We moved the build to docker last year."),
        doc(2, "2023-01-01", "tutorial", "Docker Basics", "Images, containers and volumes."),
    ])
    .await;

    let set = searcher(&backend, QueryBuilder::new()).search("docker", None, None).await.unwrap();

    assert_eq!(set.found, 2);
    assert_eq!(titles(&set), vec!["Docker Basics", "Shipping Containers"]);
    let title_highlight = set.hits[0].highlights.iter().find(|h| h.field == "title").unwrap();
    assert_eq!(title_highlight.snippet, "<mark>Docker</mark> Basics");
    let content_highlight = set.hits[1].highlights.iter().find(|h| h.field == "content").unwrap();
    assert!(content_highlight.snippet.contains("<mark>docker</mark>"));
}

#[tokio::test]
async fn empty_collection_yields_empty_set() {
    let backend = seeded(Vec::new()).await;
    let set = searcher(&backend, QueryBuilder::new()).search("", None, None).await.unwrap();
    assert_eq!(set.found, 0);
    assert!(set.is_empty());
    assert!(set.facets.is_empty());
}

#[tokio::test]
async fn match_all_sorts_by_title() {
    let backend = seeded(vec![
        doc(1, "2023-01-01", "a", "Zebra", "z"),
        doc(2, "2023-01-02", "a", "Apple", "a"),
        doc(3, "2023-01-03", "a", "Mango", "m"),
    ])
    .await;
    let set = searcher(&backend, QueryBuilder::new()).search("*", None, None).await.unwrap();
    assert_eq!(titles(&set), vec!["Apple", "Mango", "Zebra"]);
    assert!(set.hits.iter().all(|h| h.highlights.is_empty()));
}

#[tokio::test]
async fn filter_on_facet_field_narrows_results() {
    let backend = seeded(vec![
        doc(1, "2023-01-01", "a", "January", "x"),
        doc(2, "2023-03-01", "a", "March", "x"),
        doc(3, "2023-06-01", "a", "June", "x"),
    ])
    .await;
    let set = searcher(&backend, QueryBuilder::new())
        .search("*", Some("date:>=2023-02-01"), None)
        .await
        .unwrap();
    assert_eq!(titles(&set), vec!["June", "March"]);

    let set = searcher(&backend, QueryBuilder::new())
        .search("*", Some("date:[2023-01-01, 2023-06-01]"), None)
        .await
        .unwrap();
    assert_eq!(set.found, 2);
}

#[tokio::test]
async fn filter_on_non_facet_field_is_a_service_error() {
    let backend = seeded(vec![doc(1, "2023-01-01", "tutorial", "Docker Basics", "x")]).await;
    let err = searcher(&backend, QueryBuilder::new())
        .search("*", Some("type:tutorial"), None)
        .await
        .unwrap_err();
    match err {
        SearchError::Backend(e) => {
            assert_eq!(e.status(), Some(400));
            assert!(e.to_string().contains("only facet fields"));
        }
        other => panic!("expected a backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn facet_counts_follow_engine_order() {
    let backend = seeded(vec![
        doc(1, "2023-01-01", "a", "One", "x"),
        doc(2, "2023-01-02", "a", "Two", "x"),
        doc(3, "2023-01-02", "a", "Three", "x"),
    ])
    .await;
    let set = searcher(&backend, QueryBuilder::new().with_facets(["date"]))
        .search("*", None, None)
        .await
        .unwrap();
    assert_eq!(set.facets.len(), 1);
    let date = &set.facets[0];
    assert_eq!(date.field, "date");
    let counts: Vec<(&str, u64)> = date.counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
    assert_eq!(counts, vec![("2023-01-02", 2), ("2023-01-01", 1)]);
}

#[tokio::test]
async fn pages_walk_through_the_result_set() {
    let documents = (1..=7).map(|i| doc(i, "2023-01-01", "a", &format!("Post {i}"), "x")).collect();
    let backend = seeded(documents).await;
    let searcher = searcher(&backend, QueryBuilder::new());

    let first = searcher.search("*", None, Some(PageRequest::new(1, 3))).await.unwrap();
    let third = searcher.search("*", None, Some(PageRequest::new(3, 3))).await.unwrap();

    assert_eq!(first.found, 7);
    assert_eq!(titles(&first), vec!["Post 1", "Post 2", "Post 3"]);
    assert_eq!(third.page, 3);
    assert_eq!(titles(&third), vec!["Post 7"]);
}

#[tokio::test]
async fn multi_word_query_falls_back_to_any_word() {
    let backend = seeded(vec![
        doc(1, "2023-01-01", "a", "Rust Ownership", "borrowing rules"),
        doc(2, "2023-01-01", "a", "Garden Notes", "tomatoes"),
    ])
    .await;
    let set = searcher(&backend, QueryBuilder::new()).search("rust kubernetes", None, None).await.unwrap();
    assert_eq!(titles(&set), vec!["Rust Ownership"]);
}

#[tokio::test]
async fn unknown_collection_surfaces_not_found() {
    let backend = Arc::new(MemoryBackend::new());
    let err = Searcher::new(backend, "missing", QueryBuilder::new()).search("*", None, None).await.unwrap_err();
    assert!(matches!(err, SearchError::Backend(e) if e.is_not_found()));
}
