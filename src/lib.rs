//! knnbench - OpenSearch k-NN adapter for vector database benchmarks
//!
//! The adapter creates a benchmark index, bulk loads embeddings through a
//! bounded worker pool, restores search-time settings and warms up the
//! graphs, then answers k-NN queries with ranked document ids.
//!
//! ```no_run
//! use knnbench::{ConnectionConfig, EngineAdapter, IndexCaseConfig, IndexConfiguration, VectorDb};
//!
//! # async fn run() -> knnbench::Result<()> {
//! let index = IndexConfiguration::new("vdb_bench_index", 768, IndexCaseConfig::default())?;
//! let mut adapter = EngineAdapter::configure(index, ConnectionConfig::default(), true).await?;
//!
//! let session = adapter.session()?;
//! session.insert_embeddings(&[vec![0.0; 768]], &[1]).await?;
//! session.optimize().await?;
//! let ids = session.search_embedding(&[0.0; 768], 10, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod bulk;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod vector;

#[cfg(test)]
mod testing;

pub use adapter::{EngineAdapter, IndexConfiguration, IndexDescription, RetryPolicy, SearchFilter, Session, VectorDb};
pub use bulk::BulkOptions;
pub use config::{BulkConfig, Config, ConnectionConfig, EngineVariant, IndexCaseConfig, MetricType};
pub use error::{AdapterError, Result, TransportError};
