use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifier carried by a bookmark the store has not assigned one to yet.
pub const UNSAVED_ID: i64 = 0;

/// One saved link.
///
/// `lower_name` always mirrors `name`, and every key in `metadata_keys` has an
/// entry in `metadata` (and the reverse). Both pairs are only reachable
/// through the setters below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    name: String,
    #[serde(skip)]
    lower_name: String,
    description: String,
    #[serde(skip)]
    description_lower: String,
    pub content: String,
    pub project: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived: bool,
    pub tags: Vec<String>,
    metadata: HashMap<String, String>,
    metadata_keys: Vec<String>,
}

impl Bookmark {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut bookmark = Self {
            id: UNSAVED_ID,
            name: String::new(),
            lower_name: String::new(),
            description: String::new(),
            description_lower: String::new(),
            content: content.into(),
            project: String::new(),
            created_at: now,
            updated_at: now,
            archived: false,
            tags: Vec::new(),
            metadata: HashMap::new(),
            metadata_keys: Vec::new(),
        };
        bookmark.set_name(name);
        bookmark
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_metadata(key, value);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn lower_name(&self) -> &str {
        &self.lower_name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.lower_name = self.name.to_lowercase();
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn description_lower(&self) -> &str {
        &self.description_lower
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.description_lower = self.description.to_lowercase();
    }

    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        let known = self.known_key(key)?;
        self.metadata.get(known).map(String::as_str)
    }

    /// Keys in display order.
    #[must_use]
    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// `(key, value)` pairs in display order.
    pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata_keys.iter().filter_map(|key| {
            self.metadata
                .get(key)
                .map(|value| (key.as_str(), value.as_str()))
        })
    }

    /// Sets `key` to `value`. Keys compare case-insensitively; an existing key
    /// keeps its original spelling and position.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(known) = self.known_key(&key).map(ToString::to_string) {
            self.metadata.insert(known, value);
            return;
        }
        self.metadata_keys.push(key.clone());
        self.metadata.insert(key, value);
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<String> {
        let lower = key.to_lowercase();
        let position = self
            .metadata_keys
            .iter()
            .position(|known| known.to_lowercase() == lower)?;
        let known = self.metadata_keys.remove(position);
        self.metadata.remove(&known)
    }

    /// Adds an empty entry for every default field the bookmark lacks.
    pub fn fill_default_metadata(&mut self, fields: &[String]) {
        for field in fields {
            if self.known_key(field).is_none() {
                self.set_metadata(field.clone(), String::new());
            }
        }
    }

    /// Host part of `content` when it parses as a URL, empty otherwise.
    #[must_use]
    pub fn content_domain(&self) -> String {
        reqwest::Url::parse(&self.content)
            .ok()
            .and_then(|url| url.host_str().map(ToString::to_string))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn tags_string(&self, spaces: bool) -> String {
        let separator = if spaces { ", " } else { "," };
        self.tags.join(separator)
    }

    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.id != UNSAVED_ID
    }

    fn known_key(&self, key: &str) -> Option<&str> {
        let lower = key.to_lowercase();
        self.metadata_keys
            .iter()
            .find(|known| known.to_lowercase() == lower)
            .map(String::as_str)
    }
}
