/// Errors from the blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Nothing is stored under the requested path.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The logical path is absolute or escapes the store root.
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the model catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model already catalogued: {0}")]
    Duplicate(String),

    /// The backing file exists but is not a JSON array.
    #[error("catalog file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
