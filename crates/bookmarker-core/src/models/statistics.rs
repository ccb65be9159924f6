use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate snapshot computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub bookmarks: u64,
    pub archived: u64,
    pub projects: u64,
    pub tags: u64,
    pub last_bookmark: Option<DateTime<Utc>>,
    pub full_text_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_documents: Option<u64>,
    pub metadata_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}
