/// Errors that can occur while delivering pushes.
///
/// # Examples
///
/// ```rust
/// use linecut_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing project_id".to_string());
/// assert!(err.to_string().contains("project_id"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Provider configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// The provider type is not registered in the delivery registry.
    #[error("Notify: unknown push provider '{0}'")]
    UnknownProvider(String),

    /// An HTTP request to the push service failed.
    #[error("Notify: HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("Notify: JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The push service returned a non-success response.
    #[error("Notify: API error from {service}: status={status}, body={body}")]
    ApiError {
        service: String,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for delivery operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
