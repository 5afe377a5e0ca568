use vmsearch_cli::output::{ingest_summary, provision_summary, search_results};
use vmsearch_core::record::RejectReason;
use vmsearch_core::types::{
    CollectionInfo, Document, FacetCounts, FacetValueCount, HighlightFragment, Hit, SearchResultSet,
};
use vmsearch_engine::{AbortCause, IngestionReport, LineOutcome, ProvisionOutcome};

fn rejected(line: usize) -> LineOutcome {
    LineOutcome::Rejected {
        line,
        reason: RejectReason::MissingFields(vec!["content".into()]),
        data: format!("{{\"ID\":{}}}", line),
    }
}

#[test]
fn summary_lists_first_errors_and_remainder() {
    let mut outcomes = vec![LineOutcome::Imported { line: 1, id: 1 }];
    outcomes.extend((2..=8).map(rejected));
    let report = IngestionReport {
        collection: "vm_search".into(),
        outcomes,
        lines_read: 8,
        imported: 1,
        rejected: 7,
        conflicts: 0,
        aborted: None,
        verified_total: Some(1),
    };

    let text = ingest_summary(&report, 5);

    assert!(text.contains("Lines processed: 8"));
    assert!(text.contains("Successfully imported: 1 documents"));
    assert!(text.contains("Errors: 7"));
    assert!(text.contains("Line 2: Missing required fields: content"));
    assert!(text.contains("Line 6:"));
    assert!(!text.contains("Line 7:"));
    assert!(text.contains("... and 2 more errors"));
    assert!(text.contains("Total documents in collection: 1"));
    assert!(!text.contains("duplicate IDs"));
}

#[test]
fn summary_breaks_out_conflicts_and_read_errors() {
    let report = IngestionReport {
        collection: "vm_search".into(),
        outcomes: vec![LineOutcome::Rejected {
            line: 1,
            reason: RejectReason::Conflict("duplicate".into()),
            data: "{}".into(),
        }],
        lines_read: 1,
        imported: 0,
        rejected: 1,
        conflicts: 1,
        aborted: Some(AbortCause::ReadError { line: 2, message: "stream did not contain valid UTF-8".into() }),
        verified_total: None,
    };

    let text = ingest_summary(&report, 5);

    assert!(text.contains("of which duplicate IDs: 1"));
    assert!(text.contains("Reading stopped at line 2"));
    assert!(!text.contains("more errors"));
    assert!(!text.contains("Total documents"));
}

#[test]
fn provision_summary_mentions_replaced_documents() {
    let info = CollectionInfo { name: "vm_search".into(), num_documents: 0, fields: Vec::new() };
    let text = provision_summary(&ProvisionOutcome::Replaced { previous_documents: 12, info: info.clone() });
    assert!(text.contains("(12 documents)"));
    assert!(!provision_summary(&ProvisionOutcome::Created(info)).contains("Deleted"));
}

#[test]
fn results_show_preview_highlights_and_facets() {
    let set = SearchResultSet {
        found: 3,
        search_time_ms: 1,
        page: 2,
        hits: vec![Hit {
            document: Document {
                id: 7,
                date: "2023-01-01".into(),
                slug: "docker-basics".into(),
                kind: "tutorial".into(),
                title: "Docker Basics".into(),
                status: "published".into(),
                content: "a".repeat(200),
            },
            highlights: vec![HighlightFragment { field: "title".into(), snippet: "<mark>Docker</mark> Basics".into() }],
        }],
        facets: vec![FacetCounts {
            field: "date".into(),
            counts: vec![FacetValueCount { value: "2023-01-01".into(), count: 3 }],
        }],
    };

    let text = search_results("docker", &set, 2);

    assert!(text.contains("Found 3 documents for \"docker\""));
    assert!(text.contains("3. Docker Basics"));
    assert!(text.contains(&format!("Content: {}...", "a".repeat(150))));
    assert!(text.contains("title: <mark>Docker</mark> Basics"));
    assert!(text.contains("2023-01-01: 3 documents"));
}

#[test]
fn empty_results_say_so() {
    let set = SearchResultSet { found: 0, search_time_ms: 0, page: 1, hits: Vec::new(), facets: Vec::new() };
    assert_eq!(search_results("*", &set, 50), "No documents found for \"*\"\n");
}
