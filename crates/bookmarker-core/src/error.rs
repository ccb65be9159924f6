use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, BookmarkerError>;

#[derive(Debug, Error)]
pub enum BookmarkerError {
    #[error("{0}")]
    Parse(String),

    #[error("cannot compile filter: {0}")]
    Compile(String),

    #[error("store busy: {0}")]
    StoreBusy(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("search backend unavailable: {0}")]
    SearchUnavailable(String),

    #[error("invalid search query: {0}")]
    SearchQuery(String),

    #[error(transparent)]
    Index(#[from] tantivy::TantivyError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl BookmarkerError {
    pub(crate) fn lock_timeout(resource: &str, timeout: std::time::Duration) -> Self {
        Self::StoreBusy(format!(
            "{resource} lock not acquired within {}ms",
            timeout.as_millis()
        ))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_ERROR",
            Self::Compile(_) => "COMPILE_ERROR",
            Self::StoreBusy(_) => "STORE_BUSY",
            Self::Store(_) => "STORE_ERROR",
            Self::SearchUnavailable(_) => "SEARCH_UNAVAILABLE",
            Self::SearchQuery(_) => "SEARCH_QUERY_ERROR",
            Self::Index(_) => "SEARCH_INDEX_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Search failures are kept apart from store failures so a caller can
    /// retry against the other backend.
    #[must_use]
    pub const fn is_search_error(&self) -> bool {
        matches!(
            self,
            Self::SearchUnavailable(_) | Self::SearchQuery(_) | Self::Index(_)
        )
    }

    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::StoreBusy(_))
    }

    pub fn to_payload(&self, operation: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_errors_are_distinguishable_from_store_errors() {
        let search = BookmarkerError::SearchUnavailable("index missing".to_string());
        let store = BookmarkerError::Store(rusqlite::Error::InvalidQuery);
        assert!(search.is_search_error());
        assert!(!search.is_store_error());
        assert!(store.is_store_error());
        assert!(!store.is_search_error());
    }

    #[test]
    fn payload_carries_code_and_message() {
        let err = BookmarkerError::Parse("invalid query: 'a:b:c'".to_string());
        let payload = err.to_payload("filter");
        assert_eq!(payload.code, "PARSE_ERROR");
        assert_eq!(payload.message, "invalid query: 'a:b:c'");
        assert_eq!(payload.operation, "filter");
        assert!(!payload.trace_id.is_empty());
    }
}
