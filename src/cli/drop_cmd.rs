//! Drop command - delete the benchmark index

use clap::Args;

use super::TargetArgs;

#[derive(Args)]
pub struct DropArgs {
    /// Fail if the index does not exist
    #[arg(long)]
    pub strict: bool,
}

pub async fn run(args: DropArgs, target: &TargetArgs) -> anyhow::Result<()> {
    // The dimension plays no part in deleting
    let adapter = target.adapter(Some(1), false).await?;
    let name = adapter.index().name().to_string();

    if adapter.drop_index().await? {
        println!("Deleted index '{}'", name);
    } else if args.strict {
        anyhow::bail!("Index '{}' not found", name);
    } else {
        println!("Index '{}' not found", name);
    }
    Ok(())
}
