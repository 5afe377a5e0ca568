//! Line-delimited corpus ingestion.
//!
//! Every line is decoded, validated and submitted in input order. A bad line
//! is recorded in the report and never stops the run. With `concurrency > 1`
//! submissions go out in windows of that many documents; outcomes are still
//! recorded in line order and two lines carrying the same `ID` are never in
//! flight together.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{info, warn};

use vmsearch_core::config::IngestConfig;
use vmsearch_core::error::{BackendError, IngestError, SearchError};
use vmsearch_core::record::{decode_line, preview, RejectReason};
use vmsearch_core::traits::SearchBackend;

use crate::normalize::normalize;
use crate::query::QueryBuilder;

const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LineOutcome {
    Imported { line: usize, id: i64 },
    Rejected { line: usize, reason: RejectReason, data: String },
}

impl LineOutcome {
    /// 1-based line number in the source.
    pub fn line(&self) -> usize {
        match self {
            Self::Imported { line, .. } | Self::Rejected { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortCause {
    Cancelled,
    ReadError { line: usize, message: String },
}

/// Outcome of one ingestion run. Valid up to the abort point if the run was cut short.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub collection: String,
    pub outcomes: Vec<LineOutcome>,
    /// Every line read, blank ones included.
    pub lines_read: usize,
    pub imported: usize,
    pub rejected: usize,
    /// Subset of `rejected` caused by a duplicate `ID`.
    pub conflicts: usize,
    pub aborted: Option<AbortCause>,
    /// Document count reported by the engine after the run; advisory only.
    pub verified_total: Option<u64>,
}

impl IngestionReport {
    fn new(collection: &str) -> Self {
        Self { collection: collection.to_string(), ..Self::default() }
    }

    pub fn processed(&self) -> usize {
        self.imported + self.rejected
    }

    pub fn rejections(&self) -> impl Iterator<Item = (usize, &RejectReason, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            LineOutcome::Rejected { line, reason, data } => Some((*line, reason, data.as_str())),
            LineOutcome::Imported { .. } => None,
        })
    }

    fn record(&mut self, outcome: LineOutcome) {
        match &outcome {
            LineOutcome::Imported { .. } => {
                self.imported += 1;
                if self.imported % PROGRESS_EVERY == 0 {
                    info!(imported = self.imported, "Imported {} documents...", self.imported);
                }
            }
            LineOutcome::Rejected { line, reason, .. } => {
                self.rejected += 1;
                if reason.is_conflict() {
                    self.conflicts += 1;
                }
                warn!(line = *line, reason = %reason, "Rejected line");
            }
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub concurrency: usize,
    pub preview_chars: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(config: &IngestConfig) -> Self {
        Self { concurrency: config.concurrency.max(1), preview_chars: config.preview_chars }
    }
}

enum Pending {
    Done(LineOutcome),
    Submit { line: usize, id: i64, data: String, call: BoxFuture<'static, Result<(), BackendError>> },
}

/// State carried across windows of one run.
struct Run {
    report: IngestionReport,
    window: Vec<Pending>,
    /// IDs with a submission queued in `window`.
    queued: HashSet<i64>,
    /// IDs submitted (or queued) this run, with their line.
    claimed: HashMap<i64, usize>,
}

impl Run {
    fn new(collection: &str) -> Self {
        Self {
            report: IngestionReport::new(collection),
            window: Vec::new(),
            queued: HashSet::new(),
            claimed: HashMap::new(),
        }
    }

    /// Record a locally decided outcome, or hold it behind earlier queued lines.
    fn settle(&mut self, outcome: LineOutcome) {
        if self.queued.is_empty() {
            self.report.record(outcome);
        } else {
            self.window.push(Pending::Done(outcome));
        }
    }
}

pub struct Ingestor {
    backend: Arc<dyn SearchBackend>,
    options: IngestOptions,
    progress: ProgressBar,
    abort: Arc<AtomicBool>,
}

impl Ingestor {
    pub fn new(backend: Arc<dyn SearchBackend>, options: IngestOptions) -> Self {
        Self { backend, options, progress: ProgressBar::hidden(), abort: Arc::new(AtomicBool::new(false)) }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Setting the flag stops the run before the next line.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub async fn ingest_file(&self, path: &Path, collection: &str) -> Result<IngestionReport, IngestError> {
        if !path.is_file() {
            return Err(IngestError::SourceMissing(path.to_path_buf()));
        }
        self.ensure_collection(collection).await?;
        let file = File::open(path).map_err(|source| IngestError::Open { path: path.to_path_buf(), source })?;
        info!(path = %path.display(), collection, "Reading source");
        Ok(self.run(read_lines(BufReader::new(file)), collection).await)
    }

    pub async fn ingest<I>(&self, lines: I, collection: &str) -> Result<IngestionReport, IngestError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        self.ensure_collection(collection).await?;
        Ok(self.run(lines, collection).await)
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), IngestError> {
        match self.backend.retrieve_collection(collection).await {
            Ok(Some(_)) => {
                info!(collection, "Collection found");
                Ok(())
            }
            Ok(None) => Err(IngestError::CollectionMissing(collection.to_string())),
            Err(source) => Err(IngestError::Lookup { collection: collection.to_string(), source }),
        }
    }

    async fn run<I>(&self, lines: I, collection: &str) -> IngestionReport
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let mut run = Run::new(collection);

        for (index, line) in lines.into_iter().enumerate() {
            let line_no = index + 1;
            if self.abort.load(Ordering::Relaxed) {
                run.report.aborted = Some(AbortCause::Cancelled);
                break;
            }
            let raw = match line {
                Ok(raw) => raw,
                Err(e) => {
                    run.report.aborted = Some(AbortCause::ReadError { line: line_no, message: e.to_string() });
                    break;
                }
            };
            run.report.lines_read += 1;
            if raw.trim().is_empty() {
                continue;
            }
            self.progress.inc(1);

            let document = match decode_line(&raw) {
                Ok(document) => document,
                Err(reason) => {
                    run.settle(self.rejected(line_no, reason, &raw));
                    continue;
                }
            };

            // the earlier copy must settle before deciding this one
            if run.queued.contains(&document.id) {
                self.flush(&mut run).await;
            }
            if let Some(first) = run.claimed.get(&document.id) {
                let reason = RejectReason::Conflict(format!(
                    "ID {} was already imported from line {}",
                    document.id, first
                ));
                run.settle(self.rejected(line_no, reason, &raw));
                continue;
            }

            let id = document.id;
            let backend = Arc::clone(&self.backend);
            let target = collection.to_string();
            run.claimed.insert(id, line_no);
            run.queued.insert(id);
            run.window.push(Pending::Submit {
                line: line_no,
                id,
                data: preview(&raw, self.options.preview_chars),
                call: Box::pin(async move { backend.create_document(&target, &document).await }),
            });
            if run.queued.len() >= self.options.concurrency {
                self.flush(&mut run).await;
            }
        }
        self.flush(&mut run).await;
        self.progress.finish_and_clear();

        let mut report = run.report;
        if report.aborted != Some(AbortCause::Cancelled) {
            report.verified_total = self.verify(collection).await;
        }
        report
    }

    /// Await queued submissions and record everything in the window, in order.
    async fn flush(&self, run: &mut Run) {
        let settled = join_all(run.window.drain(..).map(|pending| async move {
            match pending {
                Pending::Done(outcome) => (outcome, None),
                Pending::Submit { line, id, data, call } => match call.await {
                    Ok(()) => (LineOutcome::Imported { line, id }, None),
                    Err(e) => (LineOutcome::Rejected { line, reason: classify(&e), data }, Some(id)),
                },
            }
        }))
        .await;
        run.queued.clear();
        for (outcome, failed_id) in settled {
            if let Some(id) = failed_id {
                run.claimed.remove(&id);
            }
            run.report.record(outcome);
        }
    }

    fn rejected(&self, line: usize, reason: RejectReason, raw: &str) -> LineOutcome {
        LineOutcome::Rejected { line, reason, data: preview(raw, self.options.preview_chars) }
    }

    async fn verify(&self, collection: &str) -> Option<u64> {
        let result = match self.backend.search(collection, &QueryBuilder::count_probe()).await {
            Ok(raw) => normalize(raw).map_err(SearchError::from),
            Err(e) => Err(SearchError::from(e)),
        };
        match result {
            Ok(set) => {
                info!(collection, total = set.found, "Total documents in collection");
                Some(set.found)
            }
            Err(e) => {
                warn!(collection, error = %e, "Could not verify collection document count");
                None
            }
        }
    }
}

fn classify(error: &BackendError) -> RejectReason {
    if error.is_conflict() {
        RejectReason::Conflict(error.reason().to_string())
    } else {
        RejectReason::Service(error.to_string())
    }
}

/// Split a reader into lines. Invalid UTF-8 is replaced rather than failing
/// the line; a trailing `\r` is dropped.
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader.split(b'\n').map(|chunk| {
        chunk.map(|bytes| {
            let mut line = String::from_utf8_lossy(&bytes).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            line
        })
    })
}
