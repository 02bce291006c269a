//! Adapter module - the benchmark's vector database over the k-NN plugin

mod body;
mod index;
mod traits;

pub use body::{create_index_body, search_body, search_settings, SearchFilter, NUMBER_OF_SHARDS};
pub use index::{IndexConfiguration, DEFAULT_INDEX_NAME, DEFAULT_SCALAR_FIELDS};
pub use traits::{Session, VectorDb};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bulk::{chunked, parallel_bulk, BulkOptions, DocLayout};
use crate::config::{BulkConfig, ConnectionConfig, IndexCaseConfig};
use crate::error::{AdapterError, Result, TransportError};
use crate::transport::{Connector, HttpConnector, Transport};

/// How a failed insert batch is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Fixed wait before each retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_secs(10),
        }
    }
}

impl From<&BulkConfig> for RetryPolicy {
    fn from(config: &BulkConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_secs(config.retry_backoff_secs),
        }
    }
}

/// What the engine reports about the benchmark index
#[derive(Debug, Clone)]
pub struct IndexDescription {
    pub exists: bool,
    pub mapping: Option<Value>,
    pub index_total: Option<u64>,
    pub doc_count: Option<u64>,
}

/// Benchmark vector database backed by one engine index
pub struct EngineAdapter {
    index: IndexConfiguration,
    connection: ConnectionConfig,
    connector: Arc<dyn Connector>,
    bulk: BulkOptions,
    retry: RetryPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl EngineAdapter {
    /// Configure an adapter over HTTP, recreating the index when `drop_old` is set
    pub async fn configure(index: IndexConfiguration, connection: ConnectionConfig, drop_old: bool) -> Result<Self> {
        Self::configure_with(index, connection, drop_old, Arc::new(HttpConnector)).await
    }

    /// Configure with a custom connector
    pub async fn configure_with(
        index: IndexConfiguration,
        connection: ConnectionConfig,
        drop_old: bool,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        connection.validate()?;

        info!(
            "Engine adapter: index '{}' ({} dims, {:?} on {}) @ {}:{}",
            index.name(),
            index.dim(),
            index.case().metric_type,
            index.case().engine.as_str(),
            connection.host,
            connection.port
        );

        let adapter = Self {
            index,
            connection,
            connector,
            bulk: BulkOptions::default(),
            retry: RetryPolicy::default(),
            transport: None,
        };

        if drop_old {
            let transport = adapter.connector.connect(&adapter.connection)?;
            info!("Dropping old index: {}", adapter.index.name());
            adapter.drop_index_with(transport.as_ref()).await?;
            match adapter.create_index_with(transport.as_ref()).await {
                Err(AdapterError::IndexCreation { source, .. }) if source.is_already_exists() => {
                    warn!("Index {} reappeared after drop, keeping it", adapter.index.name());
                }
                other => other?,
            }
        }

        Ok(adapter)
    }

    pub fn with_bulk_options(mut self, bulk: BulkOptions) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn index(&self) -> &IndexConfiguration {
        &self.index
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Create the index; fails if it already exists
    pub async fn create_index(&self) -> Result<()> {
        let transport = self.session_or_connect()?;
        self.create_index_with(transport.as_ref()).await
    }

    /// Delete the index if present, returning whether it existed
    pub async fn drop_index(&self) -> Result<bool> {
        let transport = self.session_or_connect()?;
        self.drop_index_with(transport.as_ref()).await
    }

    /// Existence, mapping and document counts of the index
    pub async fn describe(&self) -> Result<IndexDescription> {
        let transport = self.session_or_connect()?;
        let name = self.index.name();
        let engine_err = |source: TransportError| AdapterError::Engine {
            operation: "describe",
            index: name.to_string(),
            source,
        };

        if !transport.index_exists(name).await.map_err(engine_err)? {
            return Ok(IndexDescription {
                exists: false,
                mapping: None,
                index_total: None,
                doc_count: None,
            });
        }

        let mapping = transport.get_mapping(name).await.map_err(engine_err)?;
        let stats = transport.stats(name).await.map_err(engine_err)?;
        Ok(IndexDescription {
            exists: true,
            mapping: Some(mapping),
            index_total: Some(stats.index_total()),
            doc_count: stats.doc_count(),
        })
    }

    fn session_transport(&self) -> Result<Arc<dyn Transport>> {
        self.transport.clone().ok_or(AdapterError::NotOpen)
    }

    /// Administrative calls may run outside a session on a transient connection
    fn session_or_connect(&self) -> Result<Arc<dyn Transport>> {
        match &self.transport {
            Some(transport) => Ok(Arc::clone(transport)),
            None => self.connector.connect(&self.connection),
        }
    }

    async fn create_index_with(&self, transport: &dyn Transport) -> Result<()> {
        let name = self.index.name();
        let body = create_index_body(&self.index);

        if let Err(e) = transport.create_index(name, &body).await {
            warn!("Failed to create index: {} error: {}", name, e);
            return Err(AdapterError::IndexCreation {
                index: name.to_string(),
                source: e,
            });
        }

        info!("Created index {} ({} shards)", name, NUMBER_OF_SHARDS);
        Ok(())
    }

    async fn drop_index_with(&self, transport: &dyn Transport) -> Result<bool> {
        let name = self.index.name();
        let engine_err = |source: TransportError| AdapterError::Engine {
            operation: "drop index",
            index: name.to_string(),
            source,
        };

        if !transport.index_exists(name).await.map_err(engine_err)? {
            return Ok(false);
        }
        transport.delete_index(name).await.map_err(engine_err)?;
        info!("Deleted index {}", name);
        Ok(true)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.index.dim() {
            return Err(AdapterError::DimensionMismatch {
                expected: self.index.dim(),
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// One bulk upload of the whole batch followed by a stats read
    async fn bulk_insert(
        &self,
        transport: &Arc<dyn Transport>,
        embeddings: &[Vec<f32>],
        ids: &[i64],
    ) -> std::result::Result<(), TransportError> {
        let name = self.index.name();
        let layout = DocLayout {
            index: name,
            id_field: self.index.id_field(),
            vector_field: self.index.vector_field(),
        };

        info!("Adding {} documents to {}", embeddings.len(), name);

        let chunks = chunked(layout, ids, embeddings, self.bulk.chunk_size);
        let items = parallel_bulk(Arc::clone(transport), name, chunks, self.bulk).await?;

        let (succeeded, failed): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| item.is_success());
        info!("Added documents: {} succeeded, {} failed", succeeded.len(), failed.len());
        if let Some(item) = failed.first() {
            warn!(
                "First failed document {}: {}",
                item.id.as_deref().unwrap_or("?"),
                item.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
            );
        }

        let stats = transport.stats(name).await?;
        info!("Total document count in index: {}", stats.index_total());
        Ok(())
    }
}

#[async_trait]
impl VectorDb for EngineAdapter {
    type Config = ConnectionConfig;
    type CaseConfig = IndexCaseConfig;

    /// Each session gets its own freshly built transport
    fn open(&mut self) -> Result<()> {
        let transport = self.connector.connect(&self.connection)?;
        debug!("Opened session on {}", self.index.name());
        self.transport = Some(transport);
        Ok(())
    }

    fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("Closed session on {}", self.index.name());
        }
    }

    /// Upload the batch, retrying the whole batch after a fixed backoff
    ///
    /// The returned count is the number of documents attempted; per-document
    /// failures inside a successful upload are only logged. Ids must fit in
    /// an `i32`, the range of the engine's `integer` id mapping.
    async fn insert_embeddings(&self, embeddings: &[Vec<f32>], ids: &[i64]) -> Result<usize> {
        let transport = self.session_transport()?;
        if embeddings.len() != ids.len() {
            return Err(AdapterError::LengthMismatch {
                embeddings: embeddings.len(),
                ids: ids.len(),
            });
        }
        if let Some(&id) = ids.iter().find(|&&id| i32::try_from(id).is_err()) {
            return Err(AdapterError::IdOutOfRange(id));
        }
        for vector in embeddings {
            self.check_dim(vector)?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.bulk_insert(&transport, embeddings, ids).await {
                Ok(()) => return Ok(embeddings.len()),
                Err(e) if attempt <= self.retry.max_retries => {
                    warn!(
                        "Failed to insert data: {} error: {}, retrying in {:?}",
                        self.index.name(),
                        e,
                        self.retry.backoff
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => {
                    warn!("Failed to insert data: {} error: {}, giving up", self.index.name(), e);
                    return Err(AdapterError::Insert {
                        index: self.index.name().to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn search_embedding(&self, query: &[f32], k: usize, filter: Option<&SearchFilter>) -> Result<Vec<i64>> {
        let transport = self.session_transport()?;
        if k == 0 {
            return Err(AdapterError::InvalidTopK);
        }
        self.check_dim(query)?;

        let name = self.index.name();
        let body = search_body(&self.index, query, k, filter);
        let search_err = |source: TransportError| {
            warn!("Failed to search: {} error: {}", name, source);
            AdapterError::Search {
                index: name.to_string(),
                source,
            }
        };

        let response = transport.search(name, &body).await.map_err(search_err)?;
        debug!(
            took = response.took,
            shards = %response.shards,
            total = %response.hits.total,
            "search done"
        );

        response
            .hits
            .hits
            .iter()
            .map(|hit| {
                hit.id.parse::<i64>().map_err(|_| {
                    search_err(TransportError::UnexpectedResponse(format!(
                        "non-integer document id {:?}",
                        hit.id
                    )))
                })
            })
            .collect()
    }

    /// Restore search-time settings, refresh and warm up the graphs
    ///
    /// Warmup on a large index can run for minutes; the only bound is the
    /// connection's request timeout.
    async fn optimize(&self) -> Result<()> {
        let transport = self.session_transport()?;
        let name = self.index.name();
        let engine_err = |source: TransportError| AdapterError::Engine {
            operation: "optimize",
            index: name.to_string(),
            source,
        };

        transport.put_settings(name, &search_settings()).await.map_err(engine_err)?;
        info!("Restored refresh interval and replicas on {}", name);

        transport.refresh(name).await.map_err(engine_err)?;
        info!("Refreshed {}", name);

        transport.warmup(name).await.map_err(engine_err)?;
        info!("Warmed up {}", name);
        Ok(())
    }

    fn need_normalize_cosine(&self) -> bool {
        self.index.case().needs_cosine_normalization()
    }
}
