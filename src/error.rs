//! Error types for the adapter and its transport

/// Failure talking to the remote engine
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine error {status}: {reason}")]
    Api {
        status: u16,
        /// Engine error type, e.g. `resource_already_exists_exception`
        kind: Option<String>,
        reason: String,
    },

    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected engine response: {0}")]
    UnexpectedResponse(String),
}

impl TransportError {
    /// Whether the engine rejected an index creation because the index exists
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            TransportError::Api { kind: Some(kind), .. } if kind == "resource_already_exists_exception"
        )
    }
}

/// Errors surfaced to the benchmarking harness
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to create index {index}")]
    IndexCreation {
        index: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to insert into {index} after {attempts} attempt(s)")]
    Insert {
        index: String,
        attempts: usize,
        #[source]
        source: TransportError,
    },

    #[error("failed to search {index}")]
    Search {
        index: String,
        #[source]
        source: TransportError,
    },

    #[error("{operation} failed on {index}")]
    Engine {
        operation: &'static str,
        index: String,
        #[source]
        source: TransportError,
    },

    #[error("no open session, call open() first")]
    NotOpen,

    #[error("got {embeddings} embeddings but {ids} ids")]
    LengthMismatch { embeddings: usize, ids: usize },

    /// The id field is mapped as a 32-bit `integer`
    #[error("id {0} does not fit the index's integer id field")]
    IdOutOfRange(i64),

    #[error("vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("top k must be at least 1")]
    InvalidTopK,
}

pub type Result<T> = std::result::Result<T, AdapterError>;
