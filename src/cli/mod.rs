//! CLI module - command definitions and handlers

mod config_cmd;
mod create;
mod drop_cmd;
mod info;
mod load;
mod optimize;
mod search;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use knnbench::adapter::DEFAULT_INDEX_NAME;
use knnbench::{BulkOptions, Config, EngineAdapter, IndexConfiguration, RetryPolicy};

pub use config_cmd::ConfigArgs;
pub use create::CreateArgs;
pub use drop_cmd::DropArgs;
pub use info::InfoArgs;
pub use load::LoadArgs;
pub use optimize::OptimizeArgs;
pub use search::SearchArgs;

/// knnbench - drive an OpenSearch k-NN benchmark index
#[derive(Parser)]
#[command(name = "knnbench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Cluster and index selection, layered over the config file
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Config file (default: ~/.config/knnbench/config.toml)
    #[arg(long, global = true, env = "KNNBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cluster host
    #[arg(long, global = true, env = "KNNBENCH_HOST")]
    pub host: Option<String>,

    /// Cluster port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Basic auth user
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Basic auth password
    #[arg(long, global = true, env = "KNNBENCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use plain HTTP
    #[arg(long, global = true)]
    pub no_ssl: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Index name
    #[arg(long, global = true)]
    pub index_name: Option<String>,

    /// Vector dimension
    #[arg(long, global = true)]
    pub dim: Option<usize>,
}

impl TargetArgs {
    /// Config file values with command line overrides applied
    pub fn resolve(&self) -> Config {
        let mut config = Config::load(self.config.as_deref());
        let conn = &mut config.connection;
        if let Some(host) = &self.host {
            conn.host = host.clone();
        }
        if let Some(port) = self.port {
            conn.port = port;
        }
        if let Some(user) = &self.user {
            conn.user = user.clone();
        }
        if let Some(password) = &self.password {
            conn.password = Some(password.clone());
        }
        if self.no_ssl {
            conn.use_ssl = false;
        }
        if self.insecure {
            conn.verify_certs = false;
        }
        if let Some(name) = &self.index_name {
            config.index.name = Some(name.clone());
        }
        if let Some(dim) = self.dim {
            config.index.dim = Some(dim);
        }
        config
    }

    /// Build the adapter, taking the dimension from `fallback_dim` when unset
    pub async fn adapter(&self, fallback_dim: Option<usize>, drop_old: bool) -> anyhow::Result<EngineAdapter> {
        let config = self.resolve();
        config.bulk.validate()?;

        let name = config
            .index
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());
        let dim = config
            .index
            .dim
            .or(fallback_dim)
            .ok_or_else(|| anyhow::anyhow!("vector dimension unknown, pass --dim or set [index] dim"))?;

        let index = IndexConfiguration::new(name, dim, config.index.case.clone())?;
        let adapter = EngineAdapter::configure(index, config.connection.clone(), drop_old)
            .await?
            .with_bulk_options(BulkOptions::from(&config.bulk))
            .with_retry_policy(RetryPolicy::from(&config.bulk));
        Ok(adapter)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the benchmark index
    Create(CreateArgs),

    /// Delete the benchmark index
    Drop(DropArgs),

    /// Bulk load vectors from a JSONL file
    Load(LoadArgs),

    /// Run k-NN queries
    Search(SearchArgs),

    /// Restore search settings, refresh and warm up the index
    Optimize(OptimizeArgs),

    /// Show index mapping and document counts
    Info(InfoArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Create(args) => create::run(args, &self.target).await,
            Commands::Drop(args) => drop_cmd::run(args, &self.target).await,
            Commands::Load(args) => load::run(args, &self.target, self.verbose).await,
            Commands::Search(args) => search::run(args, &self.target).await,
            Commands::Optimize(args) => optimize::run(args, &self.target).await,
            Commands::Info(args) => info::run(args, &self.target).await,
            Commands::Config(args) => config_cmd::run(args, &self.target).await,
        }
    }
}
