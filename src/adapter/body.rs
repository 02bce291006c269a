//! Request bodies sent to the engine

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::index::IndexConfiguration;

/// Shards of a benchmark index
pub const NUMBER_OF_SHARDS: u32 = 5;

/// Optional predicate applied inside the k-NN query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    /// Identifier strictly greater than the value
    IdGreaterThan(i64),
    /// Identifier greater than or equal to the value
    IdAtLeast(i64),
    /// Exact match on a keyword field
    Term { field: String, value: String },
}

impl SearchFilter {
    pub fn to_query(&self, id_field: &str) -> Value {
        let mut clause = Map::new();
        match self {
            SearchFilter::IdGreaterThan(n) => {
                clause.insert(id_field.to_string(), json!({ "gt": n }));
                json!({ "range": clause })
            }
            SearchFilter::IdAtLeast(n) => {
                clause.insert(id_field.to_string(), json!({ "gte": n }));
                json!({ "range": clause })
            }
            SearchFilter::Term { field, value } => {
                clause.insert(field.clone(), json!(value));
                json!({ "term": clause })
            }
        }
    }
}

/// Settings and mappings for a fresh index
///
/// Refresh is disabled and replicas are dropped for the load phase;
/// `optimize` restores both.
pub fn create_index_body(index: &IndexConfiguration) -> Value {
    let mut settings = json!({
        "index": {
            "knn": true,
            "refresh_interval": "-1",
            "number_of_replicas": 0,
            "number_of_shards": NUMBER_OF_SHARDS,
        }
    });
    if let Some(ef_search) = index.case().ef_search {
        settings["index"]["knn.algo_param.ef_search"] = json!(ef_search);
    }

    let mut properties = Map::new();
    properties.insert(index.id_field().to_string(), json!({ "type": "integer" }));
    for field in index.scalar_fields() {
        properties.insert(field.clone(), json!({ "type": "keyword" }));
    }
    properties.insert(
        index.vector_field().to_string(),
        json!({
            "type": "knn_vector",
            "dimension": index.dim(),
            "method": index.case().index_param(),
        }),
    );

    json!({
        "settings": settings,
        "mappings": { "properties": properties },
    })
}

/// k-NN query for the top `k` neighbours, without the vector payload
pub fn search_body(index: &IndexConfiguration, query: &[f32], k: usize, filter: Option<&SearchFilter>) -> Value {
    let mut knn_clause = json!({ "vector": query, "k": k });
    if let Some(filter) = filter {
        knn_clause["filter"] = filter.to_query(index.id_field());
    }

    let mut knn = Map::new();
    knn.insert(index.vector_field().to_string(), knn_clause);

    json!({
        "size": k,
        "query": { "knn": knn },
        "_source": { "exclude": [index.vector_field()] },
    })
}

/// Settings that undo the load-phase tuning
pub fn search_settings() -> Value {
    json!({
        "index": {
            "refresh_interval": "60s",
            "number_of_replicas": 1,
        }
    })
}
