//! Search command - run k-NN queries against the index

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use futures::stream::{self, StreamExt};
use serde::Deserialize;

use knnbench::vector::normalize;
use knnbench::{SearchFilter, VectorDb};

use super::TargetArgs;

#[derive(Args)]
pub struct SearchArgs {
    /// Query vector as a JSON array, e.g. "[0.1, 0.2]"
    #[arg(long, conflicts_with = "queries", required_unless_present = "queries")]
    pub query: Option<String>,

    /// JSONL file with one query per line (array or {"vector": [...]})
    #[arg(long)]
    pub queries: Option<PathBuf>,

    /// Number of results to return
    #[arg(long, default_value = "10")]
    pub top_k: usize,

    /// Only return ids greater than this value
    #[arg(long)]
    pub filter_id_gt: Option<i64>,

    /// Queries in flight at once
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryLine {
    Bare(Vec<f32>),
    Record { vector: Vec<f32> },
}

fn read_queries(path: &Path) -> anyhow::Result<Vec<Vec<f32>>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| -> anyhow::Result<Vec<f32>> {
            let query: QueryLine = serde_json::from_str(l)?;
            Ok(match query {
                QueryLine::Bare(v) | QueryLine::Record { vector: v } => v,
            })
        })
        .collect()
}

pub async fn run(args: SearchArgs, target: &TargetArgs) -> anyhow::Result<()> {
    let mut queries = match (&args.query, &args.queries) {
        (Some(q), _) => vec![serde_json::from_str::<Vec<f32>>(q)?],
        (None, Some(path)) => read_queries(path)?,
        (None, None) => anyhow::bail!("pass --query or --queries"),
    };
    if queries.is_empty() {
        anyhow::bail!("No queries given");
    }

    let mut adapter = target.adapter(Some(queries[0].len()), false).await?;
    if adapter.need_normalize_cosine() {
        for q in queries.iter_mut() {
            normalize(q);
        }
    }
    let filter = args.filter_id_gt.map(SearchFilter::IdGreaterThan);
    let top_k = args.top_k;

    let session = adapter.session()?;
    let db = &*session;
    let start = Instant::now();
    let results: Vec<(usize, f64, Vec<i64>)> = stream::iter(queries.iter().enumerate())
        .map(|(i, q)| {
            let filter = filter.as_ref();
            async move {
                let t = Instant::now();
                let ids = db.search_embedding(q, top_k, filter).await?;
                Ok::<_, knnbench::AdapterError>((i, t.elapsed().as_secs_f64() * 1000.0, ids))
            }
        })
        .buffered(args.concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;
    let total_secs = start.elapsed().as_secs_f64();

    if args.format == "json" {
        let json: Vec<serde_json::Value> = results
            .iter()
            .map(|(i, ms, ids)| serde_json::json!({ "query": i, "latency_ms": ms, "ids": ids }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (i, ms, ids) in &results {
            println!("{}. ({:.2} ms) {:?}", i + 1, ms, ids);
        }
        println!(
            "\n{} queries in {:.2}s ({:.1} qps)",
            results.len(),
            total_secs,
            results.len() as f64 / total_secs.max(f64::EPSILON)
        );
    }

    Ok(())
}
