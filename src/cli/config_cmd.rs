//! Config command - manage knnbench configuration

use clap::{Args, Subcommand};

use knnbench::Config;

use super::TargetArgs;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub async fn run(args: ConfigArgs, target: &TargetArgs) -> anyhow::Result<()> {
    let path = target.config.clone().unwrap_or_else(Config::config_path);

    match args.command {
        ConfigCommands::Show => {
            if path.exists() {
                println!("# Config file: {}", path.display());
            } else {
                println!("# Config file: {} (not found, using defaults)", path.display());
            }

            let mut config = target.resolve();
            if config.connection.password.is_some() {
                config.connection.password = Some("***".to_string());
            }
            println!("{}", toml::to_string_pretty(&config)?);
        }

        ConfigCommands::Init { force } => {
            if path.exists() {
                if !force {
                    anyhow::bail!(
                        "Config file already exists at {}. Use --force to overwrite.",
                        path.display()
                    );
                }
                std::fs::remove_file(&path)?;
            }

            Config::create_example_if_missing(&path)?;
            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to point at your cluster and pick the index case:");
            println!();
            println!("  [connection]");
            println!("  host = \"search-bench.us-east-1.es.amazonaws.com\"");
            println!("  # password via KNNBENCH_PASSWORD");
            println!();
            println!("  [index]");
            println!("  dim = 768");
            println!("  metric_type = \"COSINE\"");
            println!("  engine = \"faiss\"");
        }

        ConfigCommands::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}
