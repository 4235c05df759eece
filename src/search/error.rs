//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Malformed search request (rejected before any backend is contacted)
    #[error("Invalid search request: {0}")]
    Validation(String),

    /// Search backend unreachable or returned a non-success status
    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Search backend did not answer within the configured bound
    #[error("Search backend timed out after {0}ms")]
    Timeout(u64),

    /// Search backend answered with a payload that could not be decoded
    #[error("Malformed search backend response: {0}")]
    MalformedResponse(String),

    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Document deletion failed: {0}")]
    DeletionFailed(String),

    /// Catalog store failed while serving a fallback or reconciliation read
    #[error("Catalog store error: {0}")]
    Catalog(String),

    /// Both the search backend and the catalog fallback failed
    #[error("Search unavailable: {0}")]
    Unavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SearchError {
    /// Whether this error means the backend could not serve a read.
    ///
    /// These are the failures that trigger the catalog fallback on the query path.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            SearchError::BackendUnavailable(_)
                | SearchError::Timeout(_)
                | SearchError::MalformedResponse(_)
        )
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "validation",
            SearchError::BackendUnavailable(_) => "backend_unavailable",
            SearchError::Timeout(_) => "timeout",
            SearchError::MalformedResponse(_) => "malformed_response",
            SearchError::IndexInitFailed(_) => "index_init_failed",
            SearchError::IndexingFailed(_) => "indexing_failed",
            SearchError::DeletionFailed(_) => "deletion_failed",
            SearchError::Catalog(_) => "catalog",
            SearchError::Unavailable(_) => "unavailable",
            SearchError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::BackendUnavailable(format!("request timed out: {}", err))
        } else if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else {
            SearchError::BackendUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::MalformedResponse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Validation(err.to_string())
    }
}

impl From<AppError> for SearchError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => SearchError::Validation(msg),
            AppError::Configuration(msg) => SearchError::InvalidConfiguration(msg),
            other => SearchError::Catalog(other.to_string()),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => AppError::Validation(msg),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Timeout(ms) => AppError::Timeout(format!("search backend after {}ms", ms)),
            SearchError::Unavailable(msg) => AppError::Unavailable(msg),
            SearchError::Catalog(msg) => AppError::Catalog(msg),
            SearchError::BackendUnavailable(msg) => AppError::Network(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}
