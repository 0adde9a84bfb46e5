use thiserror::Error;

/// Error taxonomy visible to callers of the service layer. Everything else
/// (fetch retries, parse failures, transaction details) stays in operator
/// logs.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Log the underlying error with context and return an `Internal`
    /// variant that does not leak storage details.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}
