//! Configuration for the engine adapter
//!
//! Config file location: ~/.config/knnbench/config.toml
//!
//! Example config:
//! ```toml
//! [connection]
//! host = "search-bench.us-east-1.es.amazonaws.com"
//! port = 443
//! user = "admin"
//! # password = "..."  # or set KNNBENCH_PASSWORD
//!
//! [index]
//! dim = 768
//! metric_type = "COSINE"  # L2, COSINE, INNER_PRODUCT
//! engine = "faiss"        # faiss, nmslib, lucene
//! ef_construction = 256
//! m = 16
//!
//! [bulk]
//! thread_count = 8
//! queue_size = 16
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AdapterError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub index: IndexSection,

    #[serde(default)]
    pub bulk: BulkConfig,
}

/// Connection to the search engine cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host name, without scheme or path
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Basic auth user
    #[serde(default = "default_user")]
    pub user: String,

    /// Basic auth password, auth is skipped when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// Verify the server's TLS certificate
    #[serde(default = "default_true")]
    pub verify_certs: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: None,
            use_ssl: true,
            verify_certs: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    443
}

fn default_user() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    600
}

impl ConnectionConfig {
    /// Reject values the transport cannot use
    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(AdapterError::Configuration("host is empty".to_string()));
        }
        if host.contains("://") || host.contains('/') {
            return Err(AdapterError::Configuration(format!(
                "host must not contain a scheme or path: {}",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(AdapterError::Configuration("port must be non-zero".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AdapterError::Configuration("timeout must be non-zero".to_string()));
        }
        if self.password.is_some() && self.user.is_empty() {
            return Err(AdapterError::Configuration(
                "password given without a user".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the cluster, e.g. `https://localhost:443`
    pub fn base_url(&self) -> Result<Url> {
        self.validate()?;
        let scheme = if self.use_ssl { "https" } else { "http" };
        let raw = format!("{}://{}:{}", scheme, self.host.trim(), self.port);
        Url::parse(&raw).map_err(|e| AdapterError::Configuration(format!("{raw}: {e}")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Similarity metric used by the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    L2,
    Cosine,
    InnerProduct,
}

/// k-NN plugin engine backing the vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVariant {
    Faiss,
    Nmslib,
    Lucene,
}

impl EngineVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineVariant::Faiss => "faiss",
            EngineVariant::Nmslib => "nmslib",
            EngineVariant::Lucene => "lucene",
        }
    }
}

/// Index algorithm parameters for one benchmark case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCaseConfig {
    #[serde(default = "default_metric")]
    pub metric_type: MetricType,

    #[serde(default = "default_engine")]
    pub engine: EngineVariant,

    /// HNSW build-time candidate list size
    #[serde(default = "default_ef_construction")]
    pub ef_construction: u32,

    /// HNSW graph degree
    #[serde(default = "default_m")]
    pub m: u32,

    /// Query-time candidate list size, engine default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ef_search: Option<u32>,
}

impl Default for IndexCaseConfig {
    fn default() -> Self {
        Self {
            metric_type: default_metric(),
            engine: default_engine(),
            ef_construction: default_ef_construction(),
            m: default_m(),
            ef_search: None,
        }
    }
}

fn default_metric() -> MetricType {
    MetricType::L2
}

fn default_engine() -> EngineVariant {
    EngineVariant::Faiss
}

fn default_ef_construction() -> u32 {
    256
}

fn default_m() -> u32 {
    16
}

impl IndexCaseConfig {
    /// Space type understood by the k-NN plugin
    ///
    /// faiss has no cosine space, so cosine runs as inner product over
    /// vectors the client normalizes.
    pub fn space_type(&self) -> &'static str {
        match (self.metric_type, self.engine) {
            (MetricType::L2, _) => "l2",
            (MetricType::InnerProduct, _) => "innerproduct",
            (MetricType::Cosine, EngineVariant::Faiss) => "innerproduct",
            (MetricType::Cosine, _) => "cosinesimil",
        }
    }

    /// The `method` document of the `knn_vector` mapping
    pub fn index_param(&self) -> Value {
        json!({
            "name": "hnsw",
            "space_type": self.space_type(),
            "engine": self.engine.as_str(),
            "parameters": {
                "ef_construction": self.ef_construction,
                "m": self.m,
            }
        })
    }

    /// Whether vectors must be normalized before they reach the engine
    pub fn needs_cosine_normalization(&self) -> bool {
        self.engine == EngineVariant::Faiss && self.metric_type == MetricType::Cosine
    }

    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(AdapterError::Configuration(format!("m must be >= 2, got {}", self.m)));
        }
        if self.ef_construction == 0 {
            return Err(AdapterError::Configuration("ef_construction must be non-zero".to_string()));
        }
        if self.ef_search == Some(0) {
            return Err(AdapterError::Configuration("ef_search must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// `[index]` section of the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexSection {
    /// Index name, overridable on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Vector dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<usize>,

    #[serde(flatten)]
    pub case: IndexCaseConfig,
}

/// Bulk loading and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Concurrent bulk requests
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Encoded chunks waiting for a worker
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Documents per bulk request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Retries of a whole failed batch
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Fixed wait before each retry
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            queue_size: default_queue_size(),
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

fn default_thread_count() -> usize {
    8
}

fn default_queue_size() -> usize {
    16
}

fn default_chunk_size() -> usize {
    500
}

fn default_max_retries() -> usize {
    1
}

fn default_retry_backoff_secs() -> u64 {
    10
}

impl BulkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 || self.queue_size == 0 || self.chunk_size == 0 {
            return Err(AdapterError::Configuration(
                "bulk thread_count, queue_size and chunk_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("knnbench")
            .join("config.toml")
    }

    /// Load config from `path` (or the default path), returning defaults if not found
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Create example config file if it doesn't exist
    pub fn create_example_if_missing(path: &Path) -> std::io::Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        let example = r#"# knnbench configuration

[connection]
host = "localhost"
port = 443
user = "admin"
# password = "..."   # or set KNNBENCH_PASSWORD
use_ssl = true
verify_certs = true
timeout_secs = 600

[index]
# name = "vdb_bench_index"
# dim = 768
# Metric: L2, COSINE, INNER_PRODUCT
metric_type = "L2"
# Engine: faiss, nmslib, lucene
engine = "faiss"
ef_construction = 256
m = 16
# ef_search = 256

[bulk]
thread_count = 8
queue_size = 16
chunk_size = 500
max_retries = 1
retry_backoff_secs = 10
"#;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, example)?;
        Ok(true)
    }
}
