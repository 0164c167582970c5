//! Error types for the filter manager

use thiserror::Error;

/// Errors surfaced by the public filter manager API
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("no filter named '{0}'")]
    NotFound(String),

    #[error("filter '{0}' already exists")]
    AlreadyExists(String),

    #[error("filter '{0}' has a delete pending, retry after reclamation")]
    PendingDelete(String),

    #[error("filter '{0}' is not proxied")]
    NotProxied(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from filter backends and the filesystem
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid filter name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("filter state is corrupt: {0}")]
    Corrupt(String),

    #[error("filter is closed")]
    Closed,

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl FilterError {
    /// True for the errors a client can recover from by retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FilterError::PendingDelete(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FilterError = BackendError::from(io).into();
        assert!(matches!(err, FilterError::Backend(BackendError::Io(_))));
    }

    #[test]
    fn test_pending_delete_is_retryable() {
        assert!(FilterError::PendingDelete("x".into()).is_retryable());
        assert!(!FilterError::NotFound("x".into()).is_retryable());
    }
}
