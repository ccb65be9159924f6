use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{BookmarkerError, Result};

use super::parse_bool;
use super::tokenize::{PredicateToken, QUERY_KEY, Tokens, tokenize};

/// A single field-match condition.
///
/// An empty `value` means the predicate is not set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Predicate {
    pub value: String,
    pub strict: bool,
}

impl Predicate {
    #[must_use]
    pub fn strict(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            strict: true,
        }
    }

    #[must_use]
    pub fn wildcard(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            strict: false,
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.value.is_empty()
    }
}

impl From<PredicateToken> for Predicate {
    fn from(token: PredicateToken) -> Self {
        Self {
            value: token.value,
            strict: token.strict,
        }
    }
}

/// A parsed query: either plain free text or a structured set of predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub name: Predicate,
    pub description: Predicate,
    pub project: Predicate,
    pub tags: Predicate,
    pub content: Predicate,
    pub archived: Option<bool>,
    /// Metadata predicates keyed by the key as typed.
    pub custom: BTreeMap<String, Predicate>,
    pub sort_field: Option<String>,
    pub query: Option<String>,
    pub(super) plain: bool,
}

impl Filter {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        Self::from_tokens(tokens)
    }

    /// Builds a filter from tokens. A non-empty free-text token wins and every
    /// other token is discarded.
    pub fn from_tokens(mut tokens: Tokens) -> Result<Self> {
        let mut filter = Self::default();
        if let Some(text) = tokens.remove(QUERY_KEY)
            && !text.value.is_empty()
        {
            filter.plain = true;
            filter.query = Some(text.value);
            return Ok(filter);
        }

        for (key, token) in tokens {
            match key.to_lowercase().as_str() {
                "name" => filter.name = token.into(),
                "description" => filter.description = token.into(),
                "project" => filter.project = token.into(),
                "tags" => filter.tags = Predicate::wildcard(token.value),
                "link" => filter.content = token.into(),
                "sort" => filter.sort_field = Some(token.value),
                "archived" => {
                    let archived = parse_bool(&token.value).ok_or_else(|| {
                        BookmarkerError::Parse(format!("invalid archived format: {}", token.value))
                    })?;
                    filter.archived = Some(archived);
                }
                _ => {
                    filter.custom.insert(key, token.into());
                }
            }
        }
        Ok(filter)
    }

    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            query: Some(text.into()),
            plain: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_plain_query(&self) -> bool {
        self.plain
    }

    /// True when none of the named fields nor free text is set. The archived
    /// predicate is not considered.
    #[must_use]
    pub fn custom_only(&self) -> bool {
        !self.has_named_predicates() && self.query.as_deref().is_none_or(str::is_empty)
    }

    /// The fully unconstrained filter (archived aside).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom_only() && self.custom.is_empty()
    }

    #[must_use]
    pub fn has_named_predicates(&self) -> bool {
        self.named_predicates().iter().any(|(_, p)| p.is_set())
    }

    /// Named predicates in compile order.
    #[must_use]
    pub(crate) fn named_predicates(&self) -> [(NamedField, &Predicate); 5] {
        [
            (NamedField::Name, &self.name),
            (NamedField::Description, &self.description),
            (NamedField::Content, &self.content),
            (NamedField::Project, &self.project),
            (NamedField::Tags, &self.tags),
        ]
    }

    /// Restricts a structured filter to unarchived bookmarks unless it already
    /// says something about archival.
    #[must_use]
    pub fn hide_archived_by_default(mut self) -> Self {
        if !self.plain && self.archived.is_none() {
            self.archived = Some(false);
        }
        self
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedField {
    Name,
    Description,
    Content,
    Project,
    Tags,
}
