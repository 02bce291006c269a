//! Create command - create the benchmark index

use clap::Args;

use super::TargetArgs;

#[derive(Args)]
pub struct CreateArgs {
    /// Delete an existing index of the same name first
    #[arg(long)]
    pub drop_old: bool,
}

pub async fn run(args: CreateArgs, target: &TargetArgs) -> anyhow::Result<()> {
    // configure() recreates the index itself when dropping
    let adapter = target.adapter(None, args.drop_old).await?;
    if !args.drop_old {
        adapter.create_index().await?;
    }

    let index = adapter.index();
    println!(
        "Created index '{}' ({} dims, {} / {})",
        index.name(),
        index.dim(),
        index.case().engine.as_str(),
        index.case().space_type()
    );
    Ok(())
}
