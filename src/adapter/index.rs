//! Index configuration

use crate::config::IndexCaseConfig;
use crate::error::{AdapterError, Result};

/// Default index name used by the benchmark
pub const DEFAULT_INDEX_NAME: &str = "vdb_bench_index";

/// Keyword fields carried for filtered cases, one per category cardinality
pub const DEFAULT_SCALAR_FIELDS: [&str; 5] = ["scalar-2", "scalar-5", "scalar-10", "scalar-100", "scalar-1000"];

/// Immutable description of the benchmark index
#[derive(Debug, Clone)]
pub struct IndexConfiguration {
    name: String,
    dim: usize,
    id_field: String,
    vector_field: String,
    scalar_fields: Vec<String>,
    case: IndexCaseConfig,
}

impl IndexConfiguration {
    /// Create a configuration with the default field names
    pub fn new(name: impl Into<String>, dim: usize, case: IndexCaseConfig) -> Result<Self> {
        let name = name.into();
        validate_index_name(&name)?;
        if dim == 0 {
            return Err(AdapterError::Configuration("dimension must be positive".to_string()));
        }
        case.validate()?;

        Ok(Self {
            name,
            dim,
            id_field: "id".to_string(),
            vector_field: "embedding".to_string(),
            scalar_fields: DEFAULT_SCALAR_FIELDS.iter().map(|s| s.to_string()).collect(),
            case,
        })
    }

    /// Override the identifier and vector field names
    pub fn with_fields(mut self, id_field: impl Into<String>, vector_field: impl Into<String>) -> Result<Self> {
        let id_field = id_field.into();
        let vector_field = vector_field.into();
        if id_field.is_empty() || vector_field.is_empty() {
            return Err(AdapterError::Configuration("field names must not be empty".to_string()));
        }
        if id_field == vector_field {
            return Err(AdapterError::Configuration(format!(
                "id and vector fields are both named {id_field}"
            )));
        }
        self.id_field = id_field;
        self.vector_field = vector_field;
        Ok(self)
    }

    pub fn with_scalar_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scalar_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn vector_field(&self) -> &str {
        &self.vector_field
    }

    pub fn scalar_fields(&self) -> &[String] {
        &self.scalar_fields
    }

    pub fn case(&self) -> &IndexCaseConfig {
        &self.case
    }
}

/// Index names must be lowercase and free of characters the engine rejects
fn validate_index_name(name: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

    let invalid = |why: &str| Err(AdapterError::Configuration(format!("invalid index name {name:?}: {why}")));

    if name.is_empty() {
        return invalid("empty");
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return invalid("must be lowercase");
    }
    if name.starts_with(['_', '-', '+']) {
        return invalid("must not start with _, - or +");
    }
    if name.contains(FORBIDDEN) {
        return invalid("contains a forbidden character");
    }
    if name == "." || name == ".." {
        return invalid("reserved name");
    }
    Ok(())
}
