use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use vmsearch_cli::output;
use vmsearch_core::config::{expand_path, Settings, SortMode};
use vmsearch_core::types::CollectionSchema;
use vmsearch_core::SearchBackend;
use vmsearch_engine::{AbortCause, IngestOptions, Ingestor, PageRequest, QueryBuilder, SchemaManager, Searcher};

#[derive(Parser)]
#[command(name = "vmsearch")]
#[command(about = "Article search: provision, ingest and query", long_about = None)]
struct Cli {
    /// Target collection; overrides `collection.name` from the config
    #[arg(short, long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the article collection, replacing any existing one
    Provision,

    /// Delete the collection and all its documents
    Drop,

    /// Import a JSONL file, one article per line
    Ingest {
        #[arg(value_name = "FILE")]
        file: String,

        /// In-flight submissions; overrides `ingest.concurrency`
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Run a query against the collection
    Search {
        /// Free text; empty or `*` matches everything
        #[arg(default_value = "*")]
        query: String,

        /// Engine filter expression over facet fields, e.g. `date:>=2023-01-01`
        filter: Option<String>,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(short = 'n', long)]
        per_page: Option<u32>,

        /// Facet field to count; repeatable
        #[arg(short, long = "facet")]
        facets: Vec<String>,

        /// `relevance` or `title`; overrides `query.sort`
        #[arg(short, long)]
        sort: Option<SortMode>,
    },

    /// Check that the engine is reachable
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    vmsearch_cli::init_tracing();
    let cli = Cli::parse();

    let mut settings = vmsearch_cli::load_settings()?;
    if let Some(collection) = cli.collection {
        settings.collection.name = collection;
    }
    let backend = vmsearch_cli::connect(&settings)?;

    match cli.command {
        Commands::Provision => {
            let manager = SchemaManager::new(backend);
            let outcome = manager
                .provision(&CollectionSchema::articles(&settings.collection.name))
                .await
                .context("Failed to create collection")?;
            print!("{}", output::provision_summary(&outcome));
        }
        Commands::Drop => {
            let dropped = SchemaManager::new(backend).drop_collection(&settings.collection.name).await?;
            if dropped {
                println!("🗑️  Deleted collection \"{}\"", settings.collection.name);
            } else {
                println!("Collection \"{}\" does not exist; nothing to delete", settings.collection.name);
            }
        }
        Commands::Ingest { file, concurrency } => {
            if let Some(concurrency) = concurrency {
                settings.ingest.concurrency = concurrency.max(1);
            }
            return ingest(&settings, backend, &file).await;
        }
        Commands::Search { query, filter, page, per_page, facets, sort } => {
            let mut builder = QueryBuilder::from_config(&settings.query);
            if !facets.is_empty() {
                builder = builder.with_facets(facets);
            }
            if let Some(sort) = sort {
                builder = builder.with_sort(sort);
            }
            let searcher = Searcher::new(backend, &settings.collection.name, builder);
            let page = PageRequest { number: page, size: per_page };
            let request = searcher.builder().build(&query, filter.as_deref(), Some(page));
            let results = searcher.execute(&request).await.context("Search failed")?;
            print!("{}", output::search_results(&request.q, &results, request.per_page));
        }
        Commands::Health => {
            let healthy = backend.health().await.context("Search engine connection failed")?;
            if !healthy {
                println!("❌ Engine at {} reports unhealthy", settings.engine.base_url());
                return Ok(ExitCode::FAILURE);
            }
            println!("✅ Engine at {} is healthy", settings.engine.base_url());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn ingest(
    settings: &Settings,
    backend: Arc<dyn SearchBackend>,
    file: &str,
) -> anyhow::Result<ExitCode> {
    let path = expand_path(file);
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {pos} lines read [{elapsed}]")?);
    progress.enable_steady_tick(Duration::from_millis(120));

    let ingestor = Ingestor::new(backend, IngestOptions::from(&settings.ingest)).with_progress(progress);
    let abort = ingestor.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current line");
            abort.store(true, Ordering::Relaxed);
        }
    });

    println!("🚀 Importing {} into \"{}\"", path.display(), settings.collection.name);
    let report = ingestor.ingest_file(&path, &settings.collection.name).await?;
    print!("{}", output::ingest_summary(&report, settings.ingest.error_details));

    Ok(match report.aborted {
        Some(AbortCause::ReadError { .. }) => ExitCode::FAILURE,
        Some(AbortCause::Cancelled) => ExitCode::from(130),
        None => {
            println!("\n🎉 Import completed!");
            ExitCode::SUCCESS
        }
    })
}
