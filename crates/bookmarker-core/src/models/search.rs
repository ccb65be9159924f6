use std::collections::BTreeMap;

use serde::Serialize;

use super::Bookmark;

/// Rows returned by a compiled filter.
///
/// Rows that fail to decode are counted in `skipped_rows` instead of being
/// dropped silently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterResult {
    pub bookmarks: Vec<Bookmark>,
    pub skipped_rows: usize,
}

impl FilterResult {
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.skipped_rows > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub bookmark: Bookmark,
    pub score: f32,
    /// Highlighted snippet per matched column.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fragments: BTreeMap<String, String>,
}

/// Result of routing one query string: structured filters go to the store,
/// free text goes to full-text search.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    Filtered(FilterResult),
    Searched { hits: Vec<SearchHit> },
}

impl QueryOutcome {
    /// The bookmarks in result order, regardless of route.
    #[must_use]
    pub fn bookmarks(&self) -> Vec<&Bookmark> {
        match self {
            Self::Filtered(result) => result.bookmarks.iter().collect(),
            Self::Searched { hits } => hits.iter().map(|hit| &hit.bookmark).collect(),
        }
    }
}
