//! Load command - bulk load vectors from a JSONL file
//!
//! Each line is `{"id": 1, "vector": [0.1, 0.2, ...]}`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::info;

use knnbench::vector::normalize_all;
use knnbench::VectorDb;

use super::TargetArgs;

#[derive(Args)]
pub struct LoadArgs {
    /// JSONL file of {"id", "vector"} records
    pub file: PathBuf,

    /// Records per insert call
    #[arg(long, default_value = "5000")]
    pub batch_size: usize,

    /// Recreate the index before loading
    #[arg(long)]
    pub drop_old: bool,

    /// Run optimize after loading
    #[arg(long)]
    pub optimize: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Record {
    pub id: i64,
    pub vector: Vec<f32>,
}

/// Read every record of a JSONL file, skipping blank lines
pub(crate) fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("{}:{}: {}", path.display(), lineno + 1, e))?;
        records.push(record);
    }
    Ok(records)
}

pub async fn run(args: LoadArgs, target: &TargetArgs, verbose: bool) -> anyhow::Result<()> {
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be positive");
    }

    let records = read_records(&args.file)?;
    if records.is_empty() {
        anyhow::bail!("No records found in {}", args.file.display());
    }
    info!("Read {} records from {:?}", records.len(), args.file);

    let first_dim = records[0].vector.len();
    let mut adapter = target.adapter(Some(first_dim), args.drop_old).await?;
    let normalize = adapter.need_normalize_cosine();
    if normalize {
        info!("Normalizing vectors for cosine on faiss");
    }

    let session = adapter.session()?;
    session.ready_to_load().await?;

    let progress = if verbose {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(records.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut inserted = 0;
    for batch in records.chunks(args.batch_size) {
        let ids: Vec<i64> = batch.iter().map(|r| r.id).collect();
        let mut embeddings: Vec<Vec<f32>> = batch.iter().map(|r| r.vector.clone()).collect();
        if normalize {
            normalize_all(&mut embeddings);
        }

        inserted += session.insert_embeddings(&embeddings, &ids).await?;
        progress.inc(batch.len() as u64);
    }
    progress.finish_and_clear();

    let load_secs = start.elapsed().as_secs_f64();
    println!(
        "Loaded {} vectors into '{}' in {:.1}s ({:.0} vectors/s)",
        inserted,
        session.index().name(),
        load_secs,
        inserted as f64 / load_secs.max(f64::EPSILON)
    );

    if args.optimize {
        let start = Instant::now();
        session.optimize().await?;
        println!("Optimized in {:.1}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}
