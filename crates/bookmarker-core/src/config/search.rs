use crate::error::{BookmarkerError, Result};

pub(super) const ENV_SEARCH_BACKEND: &str = "BOOKMARKER_SEARCH_BACKEND";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchBackend {
    /// FTS5 shadow tables kept current by triggers.
    #[default]
    Sqlite,
    /// Standalone tantivy index, rebuilt with `index_fts`.
    DocumentIndex,
}

impl SearchBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::DocumentIndex => "index",
        }
    }

    pub(crate) fn parse(raw: Option<&str>) -> Result<Self> {
        let normalized = raw.map(|value| value.trim().to_ascii_lowercase());
        match normalized.as_deref() {
            None | Some("sqlite" | "fts") => Ok(Self::Sqlite),
            Some("index" | "tantivy") => Ok(Self::DocumentIndex),
            Some(other) => Err(BookmarkerError::Validation(format!(
                "invalid {ENV_SEARCH_BACKEND}: {other} (expected sqlite|index)"
            ))),
        }
    }
}
