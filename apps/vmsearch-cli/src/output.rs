//! Human-readable renderings of ingestion reports and search results.

use std::fmt::Write;

use vmsearch_core::types::{Hit, SearchResultSet};
use vmsearch_engine::{AbortCause, IngestionReport, ProvisionOutcome};

/// Characters of `content` shown per search hit.
pub const CONTENT_PREVIEW_CHARS: usize = 150;

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn provision_summary(outcome: &ProvisionOutcome) -> String {
    let info = outcome.info();
    let mut out = String::new();
    if let ProvisionOutcome::Replaced { previous_documents, .. } = outcome {
        let _ = writeln!(out, "🗑️  Deleted existing collection \"{}\" ({} documents)", info.name, previous_documents);
    }
    let _ = writeln!(out, "✅ Collection \"{}\" created", info.name);
    let _ = writeln!(out, "📊 Fields: {}", info.fields.len());
    let _ = writeln!(out, "📄 Documents: {}", info.num_documents);
    out
}

/// Summary printed after an ingestion run; `error_details` caps the rejections spelled out.
pub fn ingest_summary(report: &IngestionReport, error_details: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n📊 Import Summary:");
    let _ = writeln!(out, "📄 Lines processed: {}", report.processed());
    let _ = writeln!(out, "✅ Successfully imported: {} documents", report.imported);
    let _ = writeln!(out, "❌ Errors: {}", report.rejected);
    if report.conflicts > 0 {
        let _ = writeln!(out, "   of which duplicate IDs: {}", report.conflicts);
    }

    if report.rejected > 0 {
        let _ = writeln!(out, "\n🚨 Error Details:");
        for (line, reason, data) in report.rejections().take(error_details) {
            let _ = writeln!(out, "   Line {}: {}", line, reason);
            let _ = writeln!(out, "   Data: {}\n", data);
        }
        if report.rejected > error_details {
            let _ = writeln!(out, "   ... and {} more errors", report.rejected - error_details);
        }
    }

    match &report.aborted {
        Some(AbortCause::Cancelled) => {
            let _ = writeln!(out, "\n⚠️  Import cancelled; counts cover the lines handled before the interrupt");
        }
        Some(AbortCause::ReadError { line, message }) => {
            let _ = writeln!(out, "\n💥 Reading stopped at line {}: {}", line, message);
        }
        None => {}
    }

    if let Some(total) = report.verified_total {
        let _ = writeln!(out, "\n📈 Total documents in collection: {}", total);
    }
    out
}

fn hit_block(out: &mut String, rank: usize, hit: &Hit) {
    let document = &hit.document;
    let _ = writeln!(out, "\n{}. {}", rank, document.title);
    let _ = writeln!(out, "   ID: {}  Type: {}  Status: {}", document.id, document.kind, document.status);
    let _ = writeln!(out, "   Date: {}  Slug: {}", document.date, document.slug);
    let _ = writeln!(out, "   Content: {}", truncate(&document.content, CONTENT_PREVIEW_CHARS));
    for fragment in &hit.highlights {
        let _ = writeln!(out, "   🔦 {}: {}", fragment.field, fragment.snippet);
    }
}

/// `per_page` is the page size the search was made with; it numbers the hits.
pub fn search_results(query: &str, set: &SearchResultSet, per_page: u32) -> String {
    let mut out = String::new();
    if set.is_empty() {
        let _ = writeln!(out, "No documents found for \"{}\"", query);
        return out;
    }

    let _ = writeln!(
        out,
        "🔍 Found {} documents for \"{}\" (page {}, {} ms)",
        set.found, query, set.page, set.search_time_ms
    );
    let offset = per_page as usize * (set.page.max(1) as usize - 1);
    for (i, hit) in set.hits.iter().enumerate() {
        hit_block(&mut out, offset + i + 1, hit);
    }

    if !set.facets.is_empty() {
        let _ = writeln!(out, "\n📊 Facet counts:");
        for facet in &set.facets {
            let _ = writeln!(out, "  {}:", facet.field);
            for value in &facet.counts {
                let _ = writeln!(out, "    {}: {} documents", value.value, value.count);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("ünïcode", 3), "ünï...");
        assert_eq!(truncate("short", 150), "short");
    }
}
