use thiserror::Error;

pub type MapResult<T> = std::result::Result<T, MapError>;

/// Failures of the structural mapping between raw documents and typed nodes.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("no registered type for apiVersion '{api_version}' kind '{kind}'")]
    UnresolvableType { api_version: String, kind: String },

    #[error("unknown type {version}/{name}")]
    UnknownType { version: String, name: String },

    #[error("document has no '{key}' field to resolve its type")]
    MissingIdentity { key: String },

    #[error("{path}: required field is missing")]
    MissingField { path: String },

    #[error("{path}: expected {expected}, found {found}")]
    ShapeMismatch { path: String, expected: String, found: String },

    #[error("{type_name} has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),
}

impl MapError {
    pub fn mismatch(path: impl Into<String>, expected: impl ToString, found: impl ToString) -> Self {
        Self::ShapeMismatch { path: path.into(), expected: expected.to_string(), found: found.to_string() }
    }
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Failures while assembling a type registry from metadata.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{version}/{owner}.{field} references unknown type '{target}'")]
    DanglingType { version: String, owner: String, field: String, target: String },

    #[error("type {version}/{name} registered twice")]
    DuplicateType { version: String, name: String },

    #[error("document identity {identity} claimed by both {first} and {second}")]
    DuplicateIdentity { identity: String, first: String, second: String },

    #[error("unknown API version '{0}'")]
    UnknownVersion(String),

    #[error("{context}: {message}")]
    Coverage { context: String, message: String },

    #[error("metadata parse error: {0}")]
    Load(#[from] serde_json::Error),
}
