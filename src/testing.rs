//! In-memory engine used by unit tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ConnectionConfig;
use crate::error::{AdapterError, TransportError};
use crate::transport::{BulkResponse, Connector, IndexStats, SearchResponse, Transport};
use crate::vector::dot;

#[derive(Default)]
struct MockIndex {
    body: Value,
    settings: Vec<Value>,
    docs: BTreeMap<String, Value>,
    index_total: u64,
    refreshed: bool,
    warmed: bool,
}

/// Records requests and stores documents in memory
#[derive(Default)]
pub struct MockTransport {
    indices: Mutex<HashMap<String, MockIndex>>,
    bulk_calls: AtomicUsize,
    search_calls: AtomicUsize,
    failing_bulks: AtomicUsize,
    fail_search: Mutex<bool>,
    rejected_ids: Mutex<HashSet<String>>,
    last_search: Mutex<Option<Value>>,
}

fn not_found(index: &str) -> TransportError {
    TransportError::Api {
        status: 404,
        kind: Some("index_not_found_exception".to_string()),
        reason: format!("no such index [{index}]"),
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` bulk requests fail with a 503
    pub fn fail_next_bulk(&self, n: usize) {
        self.failing_bulks.store(n, Ordering::SeqCst);
    }

    /// Reject these documents inside otherwise successful bulk requests
    pub fn fail_items(&self, ids: &[i64]) {
        self.rejected_ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
    }

    pub fn fail_searches(&self) {
        *self.fail_search.lock().unwrap() = true;
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn doc_count(&self, index: &str) -> usize {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map_or(0, |i| i.docs.len())
    }

    pub fn exists(&self, index: &str) -> bool {
        self.indices.lock().unwrap().contains_key(index)
    }

    pub fn create_body(&self, index: &str) -> Option<Value> {
        self.indices.lock().unwrap().get(index).map(|i| i.body.clone())
    }

    pub fn settings(&self, index: &str) -> Vec<Value> {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map(|i| i.settings.clone())
            .unwrap_or_default()
    }

    pub fn refreshed_and_warmed(&self, index: &str) -> (bool, bool) {
        self.indices
            .lock()
            .unwrap()
            .get(index)
            .map_or((false, false), |i| (i.refreshed, i.warmed))
    }

    pub fn last_search(&self) -> Option<Value> {
        self.last_search.lock().unwrap().clone()
    }

    fn vector_field(body: &Value) -> Option<String> {
        body["mappings"]["properties"]
            .as_object()?
            .iter()
            .find(|(_, v)| v["type"] == "knn_vector")
            .map(|(k, _)| k.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        Ok(self.exists(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), TransportError> {
        let mut indices = self.indices.lock().unwrap();
        if indices.contains_key(index) {
            return Err(TransportError::Api {
                status: 400,
                kind: Some("resource_already_exists_exception".to_string()),
                reason: format!("index [{index}] already exists"),
            });
        }
        indices.insert(
            index.to_string(),
            MockIndex {
                body: body.clone(),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), TransportError> {
        match self.indices.lock().unwrap().remove(index) {
            Some(_) => Ok(()),
            None => Err(not_found(index)),
        }
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, TransportError> {
        let indices = self.indices.lock().unwrap();
        let idx = indices.get(index).ok_or_else(|| not_found(index))?;
        let mut mapping = serde_json::Map::new();
        mapping.insert(index.to_string(), json!({ "mappings": idx.body["mappings"].clone() }));
        Ok(Value::Object(mapping))
    }

    async fn bulk(&self, index: &str, body: Vec<u8>) -> Result<BulkResponse, TransportError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_bulks.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_bulks.store(failing - 1, Ordering::SeqCst);
            return Err(TransportError::Api {
                status: 503,
                kind: None,
                reason: "service unavailable".to_string(),
            });
        }

        let text = String::from_utf8(body)
            .map_err(|e| TransportError::UnexpectedResponse(e.to_string()))?;
        let lines: Vec<&str> = text.lines().collect();

        let rejected = self.rejected_ids.lock().unwrap();
        let mut indices = self.indices.lock().unwrap();
        let idx = indices.entry(index.to_string()).or_default();
        let mut items = Vec::new();
        for pair in lines.chunks(2) {
            let action: Value = serde_json::from_str(pair[0])?;
            let doc: Value = serde_json::from_str(pair[1])?;
            let id = action["index"]["_id"].as_str().unwrap_or_default().to_string();
            if rejected.contains(&id) {
                items.push(json!({ "index": {
                    "_index": index, "_id": id, "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse" }
                } }));
                continue;
            }
            idx.docs.insert(id.clone(), doc);
            idx.index_total += 1;
            items.push(json!({ "index": { "_index": index, "_id": id, "status": 201 } }));
        }

        let errors = items.iter().any(|item| item["index"]["status"] != 201);
        Ok(serde_json::from_value(json!({ "took": 1, "errors": errors, "items": items }))?)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(body.clone());
        if *self.fail_search.lock().unwrap() {
            return Err(TransportError::Api {
                status: 500,
                kind: Some("search_phase_execution_exception".to_string()),
                reason: "all shards failed".to_string(),
            });
        }

        let indices = self.indices.lock().unwrap();
        let idx = indices.get(index).ok_or_else(|| not_found(index))?;
        let field = Self::vector_field(&idx.body).unwrap_or_default();
        let knn = &body["query"]["knn"][&field];
        let query: Vec<f32> = serde_json::from_value(knn["vector"].clone())?;
        let k = knn["k"].as_u64().unwrap_or(10) as usize;

        let mut scored: Vec<(String, f32)> = idx
            .docs
            .iter()
            .filter_map(|(id, doc)| {
                let v: Vec<f32> = serde_json::from_value(doc[&field].clone()).ok()?;
                Some((id.clone(), dot(&query, &v)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits: Vec<Value> = scored
            .iter()
            .map(|(id, score)| json!({ "_index": index, "_id": id, "_score": score }))
            .collect();
        Ok(serde_json::from_value(json!({
            "took": 1,
            "_shards": { "total": 5, "successful": 5, "skipped": 0, "failed": 0 },
            "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits }
        }))?)
    }

    async fn put_settings(&self, index: &str, body: &Value) -> Result<(), TransportError> {
        let mut indices = self.indices.lock().unwrap();
        let idx = indices.get_mut(index).ok_or_else(|| not_found(index))?;
        idx.settings.push(body.clone());
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), TransportError> {
        let mut indices = self.indices.lock().unwrap();
        let idx = indices.get_mut(index).ok_or_else(|| not_found(index))?;
        idx.refreshed = true;
        Ok(())
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError> {
        let indices = self.indices.lock().unwrap();
        let idx = indices.get(index).ok_or_else(|| not_found(index))?;
        Ok(serde_json::from_value(json!({
            "_all": { "primaries": {
                "docs": { "count": idx.docs.len() },
                "indexing": { "index_total": idx.index_total }
            } }
        }))?)
    }

    async fn warmup(&self, index: &str) -> Result<(), TransportError> {
        let mut indices = self.indices.lock().unwrap();
        let idx = indices.get_mut(index).ok_or_else(|| not_found(index))?;
        idx.warmed = true;
        Ok(())
    }
}

/// Hands out the same shared mock on every connect
#[derive(Clone, Default)]
pub struct MockConnector {
    pub transport: Arc<MockTransport>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Transport>, AdapterError> {
        config.validate()?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }
}
