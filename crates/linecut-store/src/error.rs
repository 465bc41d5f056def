/// Errors raised by the key-value tree.
///
/// The [`crate::KeyValueStore`] trait returns `anyhow::Result` so that
/// other backends can surface their own errors; these variants are what the
/// in-memory tree and path parsing produce.
///
/// # Examples
///
/// ```rust
/// use linecut_store::error::StoreError;
///
/// let err = StoreError::InvalidTemplate("/a/{".to_string());
/// assert!(err.to_string().contains("/a/{"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A path segment is empty or contains a reserved character.
    #[error("Store: invalid path '{0}'")]
    InvalidPath(String),

    /// A watch template has an unterminated or empty wildcard segment.
    #[error("Store: invalid path template '{0}'")]
    InvalidTemplate(String),

    /// Snapshot file could not be read or written.
    #[error("Store: snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON.
    #[error("Store: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot root is not a JSON object.
    #[error("Store: snapshot root must be an object")]
    NonObjectRoot,
}

/// Convenience `Result` alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
