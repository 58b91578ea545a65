// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! tralio-ingest: load users, history, objects or flags into Firestore.
//!
//! ```text
//! tralio-ingest --collection users --file users.csv
//! tralio-ingest --collection objects --generate 50 --dry-run
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tralio_api::db::{DocumentStore, FirestoreDb, MemoryDb, WriteMode};
use tralio_api::ingest::{
    self, coerce::coerce_row, source, synthetic, Collection, IngestOptions, MAX_BATCH_SIZE,
    SYNTHETIC_SEED,
};

#[derive(Parser)]
#[command(
    name = "tralio-ingest",
    about = "Load records into the Tralio document store",
    version
)]
struct Cli {
    /// Target collection
    #[arg(short, long, value_enum)]
    collection: Collection,

    /// CSV or JSON file (list of objects, or {"items": [...]})
    #[arg(short, long, required_unless_present = "generate", conflicts_with = "generate")]
    file: Option<PathBuf>,

    /// Generate N deterministic synthetic records instead of reading a file
    #[arg(short, long)]
    generate: Option<usize>,

    /// GCP project (default: $GCLOUD_PROJECT or $GOOGLE_CLOUD_PROJECT)
    #[arg(long, env = "GCLOUD_PROJECT")]
    project: Option<String>,

    /// Documents per atomic batch (1-500)
    #[arg(long, default_value_t = MAX_BATCH_SIZE)]
    batch_size: usize,

    /// Field holding the document id; removed from the stored payload
    #[arg(long)]
    id_field: Option<String>,

    /// Merge into existing documents instead of overwriting them
    #[arg(long)]
    merge: bool,

    /// Prepare and count records without writing
    #[arg(long)]
    dry_run: bool,

    /// Write into an in-process store (for trying the tool offline)
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let committed = e
                .downcast_ref::<ingest::IngestError>()
                .map(ingest::IngestError::committed)
                .unwrap_or(0);
            tracing::error!(error = %format!("{e:#}"), committed, "Ingestion failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let rows = match (&cli.file, cli.generate) {
        (Some(path), _) => source::load_file(path)?,
        (None, Some(count)) => {
            synthetic::generate(cli.collection, count, SYNTHETIC_SEED, chrono::Utc::now())
        }
        (None, None) => anyhow::bail!("either --file or --generate is required"),
    };

    let now = chrono::Utc::now();
    let rows: Vec<_> = rows
        .into_iter()
        .map(|row| coerce_row(cli.collection, row, now))
        .collect();

    tracing::info!(
        collection = cli.collection.name(),
        count = rows.len(),
        "Records prepared"
    );

    let opts = IngestOptions {
        collection: cli.collection,
        batch_size: cli.batch_size,
        id_field: cli.id_field.clone(),
        mode: if cli.merge {
            WriteMode::Merge
        } else {
            WriteMode::Overwrite
        },
        dry_run: cli.dry_run,
    };

    let store: Box<dyn DocumentStore> = if cli.memory || cli.dry_run {
        Box::new(MemoryDb::new())
    } else {
        let project = cli
            .project
            .or_else(|| std::env::var("GOOGLE_CLOUD_PROJECT").ok())
            .context("no project: pass --project or set GCLOUD_PROJECT")?;
        let credentials = std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        Box::new(FirestoreDb::new(&project, credentials.as_deref()).await?)
    };

    let report = ingest::ingest(store.as_ref(), rows, &opts).await?;

    tracing::info!(
        collection = cli.collection.name(),
        total = report.total,
        written = report.written,
        batches = report.batches,
        dry_run = cli.dry_run,
        "Ingestion complete"
    );
    Ok(())
}
