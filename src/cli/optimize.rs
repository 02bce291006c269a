//! Optimize command - prepare a loaded index for queries

use std::time::Instant;

use clap::Args;

use knnbench::VectorDb;

use super::TargetArgs;

#[derive(Args)]
pub struct OptimizeArgs {}

pub async fn run(_args: OptimizeArgs, target: &TargetArgs) -> anyhow::Result<()> {
    let mut adapter = target.adapter(Some(1), false).await?;
    let session = adapter.session()?;

    let start = Instant::now();
    session.optimize().await?;
    println!(
        "Optimized index '{}' in {:.1}s",
        session.index().name(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
