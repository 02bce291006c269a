//! Parallel bulk upload with a bounded worker pool
//!
//! A producer encodes documents into NDJSON chunks and pushes them into a
//! bounded queue; a fixed number of workers drain it, one bulk request per
//! chunk. The queue bound backpressures the producer so at most
//! `queue_size + thread_count` chunks are held in memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::BulkConfig;
use crate::error::TransportError;
use crate::transport::{BulkItem, Transport};

/// Worker pool sizing for one bulk upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Concurrent bulk requests
    pub thread_count: usize,
    /// Chunks that may wait for a worker
    pub queue_size: usize,
    /// Documents per chunk
    pub chunk_size: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            thread_count: 8,
            queue_size: 16,
            chunk_size: 500,
        }
    }
}

impl From<&BulkConfig> for BulkOptions {
    fn from(config: &BulkConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            queue_size: config.queue_size,
            chunk_size: config.chunk_size,
        }
    }
}

/// One pre-encoded bulk request body
#[derive(Debug, Clone)]
pub struct BulkChunk {
    pub body: Vec<u8>,
    pub docs: usize,
}

/// Field layout of the documents being written
#[derive(Debug, Clone, Copy)]
pub struct DocLayout<'a> {
    pub index: &'a str,
    pub id_field: &'a str,
    pub vector_field: &'a str,
}

/// Encode one `index` action per document
///
/// Each document is written with both `_id` and the id field so it can be
/// filtered on at search time.
pub fn encode_chunk(layout: DocLayout<'_>, ids: &[i64], vectors: &[Vec<f32>]) -> BulkChunk {
    let mut body = Vec::with_capacity(vectors.len() * (vectors.first().map_or(0, Vec::len) * 12 + 96));

    for (id, vector) in ids.iter().zip(vectors) {
        let action = json!({ "index": { "_index": layout.index, "_id": id.to_string() } });
        let mut doc = serde_json::Map::with_capacity(2);
        doc.insert(layout.id_field.to_string(), json!(id));
        doc.insert(layout.vector_field.to_string(), json!(vector));

        // Writing into a Vec cannot fail for these values
        let _ = serde_json::to_writer(&mut body, &action);
        body.push(b'\n');
        let _ = serde_json::to_writer(&mut body, &doc);
        body.push(b'\n');
    }

    BulkChunk {
        body,
        docs: ids.len().min(vectors.len()),
    }
}

/// Split paired ids and vectors into encoded chunks, lazily
pub fn chunked<'a>(
    layout: DocLayout<'a>,
    ids: &'a [i64],
    vectors: &'a [Vec<f32>],
    chunk_size: usize,
) -> impl Iterator<Item = BulkChunk> + 'a {
    ids.chunks(chunk_size.max(1))
        .zip(vectors.chunks(chunk_size.max(1)))
        .map(move |(ids, vectors)| encode_chunk(layout, ids, vectors))
}

/// Upload all chunks and return every per-document outcome
///
/// All workers are joined before returning. The first failed request stops
/// the pool: the producer sends nothing more and queued chunks are dropped
/// unsent. The first error is returned.
pub async fn parallel_bulk<I>(
    transport: Arc<dyn Transport>,
    index: &str,
    chunks: I,
    options: BulkOptions,
) -> Result<Vec<BulkItem>, TransportError>
where
    I: IntoIterator<Item = BulkChunk>,
{
    let (tx, rx) = mpsc::channel::<BulkChunk>(options.queue_size.max(1));
    let rx = Arc::new(Mutex::new(rx));
    let failed = Arc::new(AtomicBool::new(false));

    let mut workers = JoinSet::new();
    for worker in 0..options.thread_count.max(1) {
        let rx = Arc::clone(&rx);
        let failed = Arc::clone(&failed);
        let transport = Arc::clone(&transport);
        let index = index.to_string();

        workers.spawn(async move {
            let mut items = Vec::new();
            loop {
                // Lock only while waiting for the next chunk
                let next = rx.lock().await.recv().await;
                let Some(chunk) = next else { break };
                if failed.load(Ordering::SeqCst) {
                    break;
                }

                let docs = chunk.docs;
                let response = match transport.bulk(&index, chunk.body).await {
                    Ok(response) => response,
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        return Err(e);
                    }
                };
                debug!(worker, docs, took = response.took, "bulk chunk done");
                items.extend(response.into_items());
            }
            Ok::<_, TransportError>(items)
        });
    }
    // Workers own the receiver from here on; once they all exit, sends fail
    drop(rx);

    for chunk in chunks {
        if failed.load(Ordering::SeqCst) || tx.send(chunk).await.is_err() {
            warn!("bulk request failed, abandoning remaining chunks");
            break;
        }
    }
    drop(tx);

    let mut items = Vec::new();
    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(worker_items)) => items.extend(worker_items),
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(TransportError::UnexpectedResponse(format!(
                    "bulk worker panicked: {e}"
                )));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    const LAYOUT: DocLayout<'static> = DocLayout {
        index: "idx",
        id_field: "id",
        vector_field: "embedding",
    };

    #[test]
    fn test_encode_chunk() {
        let chunk = encode_chunk(LAYOUT, &[7, 8], &[vec![0.5, 1.0], vec![2.0, 3.0]]);
        assert_eq!(chunk.docs, 2);

        let text = String::from_utf8(chunk.body).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "idx");
        assert_eq!(action["index"]["_id"], "7");

        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["id"], 7);
        assert_eq!(doc["embedding"], json!([0.5, 1.0]));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_chunked_sizes() {
        let ids: Vec<i64> = (0..1203).collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|&i| vec![i as f32]).collect();
        let sizes: Vec<usize> = chunked(LAYOUT, &ids, &vectors, 500).map(|c| c.docs).collect();
        assert_eq!(sizes, vec![500, 500, 203]);
    }

    #[tokio::test]
    async fn test_parallel_bulk_collects_all_items() {
        let transport = Arc::new(MockTransport::new());
        let ids: Vec<i64> = (0..1000).collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|&i| vec![i as f32, 1.0]).collect();

        let options = BulkOptions {
            thread_count: 4,
            queue_size: 2,
            chunk_size: 64,
        };
        let items = parallel_bulk(
            transport.clone(),
            "idx",
            chunked(LAYOUT, &ids, &vectors, options.chunk_size),
            options,
        )
        .await
        .unwrap();

        assert_eq!(items.len(), 1000);
        assert!(items.iter().all(BulkItem::is_success));
        assert_eq!(transport.doc_count("idx"), 1000);
        assert_eq!(transport.bulk_calls(), 16);
    }

    #[tokio::test]
    async fn test_parallel_bulk_reports_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_bulk(1);

        let ids: Vec<i64> = (0..10).collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|&i| vec![i as f32]).collect();
        let result = parallel_bulk(
            transport,
            "idx",
            chunked(LAYOUT, &ids, &vectors, 5),
            BulkOptions::default(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_parallel_bulk_stops_after_first_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_bulk(1);

        let ids: Vec<i64> = (0..100).collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|&i| vec![i as f32]).collect();
        let options = BulkOptions {
            thread_count: 2,
            queue_size: 1,
            chunk_size: 5,
        };
        let result = parallel_bulk(
            transport.clone(),
            "idx",
            chunked(LAYOUT, &ids, &vectors, options.chunk_size),
            options,
        )
        .await;

        assert!(result.is_err());
        // 20 chunks in total; only those already in flight may still be sent
        assert!(transport.bulk_calls() < 20, "sent {} chunks", transport.bulk_calls());
        assert!(transport.doc_count("idx") < 95);
    }
}
