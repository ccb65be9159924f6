use std::time::Duration;

use crate::error::Result;

mod env;
mod search;

pub use search::SearchBackend;

const ENV_DEFAULT_METADATA: &str = "BOOKMARKER_DEFAULT_METADATA";
const ENV_HIDE_ARCHIVED: &str = "BOOKMARKER_HIDE_ARCHIVED";
const ENV_AUTOCOMPLETE_MAX_RESULTS: &str = "BOOKMARKER_AUTOCOMPLETE_MAX_RESULTS";
const ENV_STORE_TIMEOUT_MS: &str = "BOOKMARKER_STORE_TIMEOUT_MS";
const ENV_INDEX_TIMEOUT_MS: &str = "BOOKMARKER_INDEX_TIMEOUT_MS";

const BUILTIN_METADATA_FIELDS: [&str; 6] =
    ["Author", "Published At", "Language", "Ipfs", "Class", "Title"];
const DEFAULT_AUTOCOMPLETE_MAX_RESULTS: usize = 20;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_INDEX_TIMEOUT_MS: u64 = 5_000;

/// Runtime configuration handed to [`crate::Bookmarker`].
///
/// There is no global copy of this value; every component that needs a
/// setting receives it from the caller.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub search_backend: SearchBackend,
    pub default_metadata_fields: Vec<String>,
    pub hide_archived: bool,
    pub autocomplete_max_results: usize,
    pub store_timeout: Duration,
    pub index_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_backend: SearchBackend::default(),
            default_metadata_fields: BUILTIN_METADATA_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            hide_archived: true,
            autocomplete_max_results: DEFAULT_AUTOCOMPLETE_MAX_RESULTS,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            index_timeout: Duration::from_millis(DEFAULT_INDEX_TIMEOUT_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let extra_fields = env::read_non_empty_env(ENV_DEFAULT_METADATA)
            .map(|raw| env::split_csv(&raw))
            .unwrap_or_default();
        Ok(Self {
            search_backend: SearchBackend::parse(
                std::env::var(search::ENV_SEARCH_BACKEND).ok().as_deref(),
            )?,
            default_metadata_fields: merge_metadata_fields(
                defaults.default_metadata_fields,
                extra_fields,
            ),
            hide_archived: env::parse_enabled_default_true(
                std::env::var(ENV_HIDE_ARCHIVED).ok().as_deref(),
            ),
            autocomplete_max_results: env::read_env_usize(
                ENV_AUTOCOMPLETE_MAX_RESULTS,
                DEFAULT_AUTOCOMPLETE_MAX_RESULTS,
                1,
            ),
            store_timeout: Duration::from_millis(env::read_env_u64(
                ENV_STORE_TIMEOUT_MS,
                DEFAULT_STORE_TIMEOUT_MS,
                1,
            )),
            index_timeout: Duration::from_millis(env::read_env_u64(
                ENV_INDEX_TIMEOUT_MS,
                DEFAULT_INDEX_TIMEOUT_MS,
                1,
            )),
        })
    }

    #[must_use]
    pub fn with_search_backend(mut self, backend: SearchBackend) -> Self {
        self.search_backend = backend;
        self
    }

    #[must_use]
    pub fn with_default_metadata_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extra = fields.into_iter().map(Into::into).collect();
        self.default_metadata_fields = merge_metadata_fields(self.default_metadata_fields, extra);
        self
    }
}

/// Appends user fields after the built-in ones, dropping case-insensitive
/// duplicates.
fn merge_metadata_fields(base: Vec<String>, extra: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for field in base.into_iter().chain(extra) {
        if !out.iter().any(|known| known.eq_ignore_ascii_case(&field)) {
            out.push(field);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metadata_fields_match_builtin_list() {
        let config = AppConfig::default();
        assert_eq!(
            config.default_metadata_fields,
            vec!["Author", "Published At", "Language", "Ipfs", "Class", "Title"]
        );
    }

    #[test]
    fn merge_keeps_order_and_drops_duplicates() {
        let config = AppConfig::default().with_default_metadata_fields(["author", "Rating"]);
        assert_eq!(config.default_metadata_fields.len(), 7);
        assert_eq!(
            config.default_metadata_fields.last().map(String::as_str),
            Some("Rating")
        );
    }
}
