//! Transport module - the engine REST surface the adapter depends on

mod rest;

pub use rest::{HttpConnector, HttpTransport};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::error::{AdapterError, TransportError};

/// Requests the adapter issues against the remote engine
#[async_trait]
pub trait Transport: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, TransportError>;

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), TransportError>;

    async fn delete_index(&self, index: &str) -> Result<(), TransportError>;

    /// Mapping document, keyed by index name
    async fn get_mapping(&self, index: &str) -> Result<Value, TransportError>;

    /// Send one NDJSON bulk body
    async fn bulk(&self, index: &str, body: Vec<u8>) -> Result<BulkResponse, TransportError>;

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, TransportError>;

    async fn put_settings(&self, index: &str, body: &Value) -> Result<(), TransportError>;

    async fn refresh(&self, index: &str) -> Result<(), TransportError>;

    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError>;

    /// Load the index's native graph files into memory
    async fn warmup(&self, index: &str) -> Result<(), TransportError>;
}

/// Opens a fresh transport for each session
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Transport>, AdapterError>;
}

/// Response of `POST /_bulk`
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    /// One single-key object per action, e.g. `{"index": {...}}`
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItem>>,
}

/// Outcome of one bulk action
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

impl BulkResponse {
    /// Flatten the action wrappers into their outcomes
    pub fn into_items(self) -> impl Iterator<Item = BulkItem> {
        self.items.into_iter().filter_map(|item| item.into_values().next())
    }
}

/// Response of `POST /{index}/_search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(rename = "_shards", default)]
    pub shards: Value,
    pub hits: Hits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f32>,
}

/// The part of `GET /{index}/_stats` the adapter reads
#[derive(Debug, Clone, Deserialize)]
pub struct IndexStats {
    #[serde(rename = "_all")]
    pub all: StatsGroup,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsGroup {
    pub primaries: PrimaryStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryStats {
    pub indexing: IndexingStats,
    #[serde(default)]
    pub docs: Option<DocStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexingStats {
    pub index_total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocStats {
    pub count: u64,
}

impl IndexStats {
    /// `_all.primaries.indexing.index_total`
    pub fn index_total(&self) -> u64 {
        self.all.primaries.indexing.index_total
    }

    /// Live document count, when the engine reports it
    pub fn doc_count(&self) -> Option<u64> {
        self.all.primaries.docs.as_ref().map(|d| d.count)
    }
}
