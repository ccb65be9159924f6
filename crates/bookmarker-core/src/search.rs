use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::SearchBackend;
use crate::error::Result;
use crate::index::DocumentIndex;
use crate::models::SearchHit;
use crate::query::RESULT_LIMIT;
use crate::state::SqliteBookmarkStore;

/// How free text is handed to a search backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// The whole text is one quoted phrase.
    Exact,
    /// The text is handed to the backend's query language. Terms FTS5 cannot
    /// read as barewords are quoted first.
    #[default]
    Freeform,
}

impl SearchMode {
    #[must_use]
    pub const fn from_exact(exact: bool) -> Self {
        if exact { Self::Exact } else { Self::Freeform }
    }

    /// FTS5 match expression. Embedded quotes are doubled inside a phrase.
    #[must_use]
    pub fn fts_query(self, text: &str) -> String {
        match self {
            Self::Exact => format!("\"{}\"", text.replace('"', "\"\"")),
            Self::Freeform => fts_freeform(text),
        }
    }

    /// Tantivy query string. Embedded quotes are dropped from a phrase; the
    /// tokenizer ignores them anyway.
    #[must_use]
    pub fn index_query(self, text: &str) -> String {
        match self {
            Self::Exact => format!("\"{}\"", text.replace('"', " ")),
            Self::Freeform => text.to_string(),
        }
    }
}

const FTS_COLUMNS: [&str; 4] = ["name", "description", "content", "project"];

/// Quotes every term holding characters outside the FTS5 bareword set, so
/// `github.com` becomes the phrase `"github.com"`. Operators, column filters,
/// prefix stars, parentheses and quoted phrases are left alone.
fn fts_freeform(text: &str) -> String {
    let mut terms = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let quoted = rest.starts_with('"');
        let end = if quoted {
            quoted_len(rest)
        } else {
            rest.find(|c: char| c.is_whitespace() || c == '"')
                .unwrap_or(rest.len())
        };
        let (term, tail) = rest.split_at(end);
        terms.push(if quoted {
            term.to_string()
        } else {
            fts_term(term)
        });
        rest = tail.trim_start();
    }
    terms.join(" ")
}

// Length of a leading phrase with its optional prefix star. An unclosed quote
// takes the rest of the text so FTS5 reports it.
fn quoted_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut at = 1;
    while at < bytes.len() {
        if bytes[at] == b'"' {
            if bytes.get(at + 1) == Some(&b'"') {
                at += 2;
                continue;
            }
            at += 1;
            if bytes.get(at) == Some(&b'*') {
                at += 1;
            }
            return at;
        }
        at += 1;
    }
    text.len()
}

fn fts_term(term: &str) -> String {
    if matches!(term, "AND" | "OR" | "NOT") {
        return term.to_string();
    }
    let inner = term.trim_start_matches('(');
    let open = &term[..term.len() - inner.len()];
    let body = inner.trim_end_matches(')');
    let close = &inner[body.len()..];
    let (body, star) = match body.strip_suffix('*') {
        Some(stem) => (stem, "*"),
        None => (body, ""),
    };
    let (column, body) = match body.split_once(':') {
        Some((name, tail)) if FTS_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name)) => {
            (&body[..=name.len()], tail)
        }
        _ => ("", body),
    };
    if body.chars().all(is_bareword_char) {
        format!("{open}{column}{body}{star}{close}")
    } else {
        format!("{open}{column}\"{body}\"{star}{close}")
    }
}

const fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

/// A full-text backend. Implementations must fail with a search error, not an
/// empty result, when their underlying resource is unusable.
pub trait TextSearch: Send + Sync {
    fn backend(&self) -> SearchBackend;
    fn search(&self, text: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>>;
    /// Documents held by a standalone index, `None` when the backend lives
    /// inside the store.
    fn indexed_documents(&self) -> Option<u64>;
}

/// Trigger-maintained FTS5 tables inside the bookmark store.
#[derive(Debug, Clone)]
pub struct SqliteTextSearch {
    store: SqliteBookmarkStore,
}

impl SqliteTextSearch {
    #[must_use]
    pub const fn new(store: SqliteBookmarkStore) -> Self {
        Self { store }
    }
}

impl TextSearch for SqliteTextSearch {
    fn backend(&self) -> SearchBackend {
        SearchBackend::Sqlite
    }

    fn search(&self, text: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>> {
        self.store.full_text_search(&mode.fts_query(text), limit)
    }

    fn indexed_documents(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct DocumentIndexSearch {
    index: Arc<DocumentIndex>,
}

impl DocumentIndexSearch {
    #[must_use]
    pub const fn new(index: Arc<DocumentIndex>) -> Self {
        Self { index }
    }
}

impl TextSearch for DocumentIndexSearch {
    fn backend(&self) -> SearchBackend {
        SearchBackend::DocumentIndex
    }

    fn search(&self, text: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>> {
        self.index.search(text, mode, limit)
    }

    fn indexed_documents(&self) -> Option<u64> {
        Some(self.index.doc_count())
    }
}

/// Routes free text to the configured backend.
pub struct SearchDispatcher {
    backend: Box<dyn TextSearch>,
    limit: usize,
}

impl std::fmt::Debug for SearchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDispatcher")
            .field("backend", &self.backend.backend())
            .field("limit", &self.limit)
            .finish()
    }
}

impl SearchDispatcher {
    #[must_use]
    pub fn new(backend: Box<dyn TextSearch>) -> Self {
        Self {
            backend,
            limit: RESULT_LIMIT,
        }
    }

    /// Blank text returns no hits without touching the backend.
    pub fn search(&self, text: &str, mode: SearchMode) -> Result<Vec<SearchHit>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let backend = self.backend.backend();
        debug!(backend = backend.as_str(), ?mode, "dispatching search");
        self.backend.search(text, mode, self.limit)
    }

    #[must_use]
    pub fn backend(&self) -> SearchBackend {
        self.backend.backend()
    }

    #[must_use]
    pub fn indexed_documents(&self) -> Option<u64> {
        self.backend.indexed_documents()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tempfile::tempdir;

    use crate::error::BookmarkerError;
    use crate::models::Bookmark;

    use super::*;

    #[derive(Default)]
    struct RecordingSearch {
        calls: Mutex<Vec<(String, SearchMode, usize)>>,
    }

    impl TextSearch for Arc<RecordingSearch> {
        fn backend(&self) -> SearchBackend {
            SearchBackend::Sqlite
        }

        fn search(&self, text: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((text.to_string(), mode, limit));
            Ok(Vec::new())
        }

        fn indexed_documents(&self) -> Option<u64> {
            None
        }
    }

    #[test]
    fn exact_mode_quotes_for_each_backend() {
        assert_eq!(SearchMode::Exact.fts_query("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(SearchMode::Exact.index_query("say \"hi\""), "\"say  hi \"");
        assert_eq!(SearchMode::Freeform.fts_query("a OR b*"), "a OR b*");
        assert_eq!(SearchMode::from_exact(true), SearchMode::Exact);
    }

    #[test]
    fn freeform_quotes_terms_fts5_cannot_parse() {
        let fts = |text| SearchMode::Freeform.fts_query(text);
        assert_eq!(fts("github.com"), "\"github.com\"");
        assert_eq!(fts("rust-lang  book"), "\"rust-lang\" book");
        assert_eq!(fts("name:cooking"), "name:cooking");
        assert_eq!(fts("project:work.research"), "project:\"work.research\"");
        assert_eq!(fts("(a.b* OR c)"), "(\"a.b\"* OR c)");
        assert_eq!(fts("\"official way\" doc.rs"), "\"official way\" \"doc.rs\"");
        assert_eq!(fts("say \"a \"\"b\"\"\"*"), "say \"a \"\"b\"\"\"*");
        assert_eq!(fts("über café"), "über café");
        assert_eq!(fts("\"unclosed x.y"), "\"unclosed x.y");
    }

    #[test]
    fn blank_text_never_reaches_the_backend() {
        let recorder = Arc::new(RecordingSearch::default());
        let dispatcher = SearchDispatcher::new(Box::new(Arc::clone(&recorder)));
        assert!(dispatcher.search("   ", SearchMode::Freeform).expect("search").is_empty());
        assert!(recorder.calls.lock().expect("calls lock").is_empty());

        dispatcher
            .search(" rust ", SearchMode::Exact)
            .expect("search");
        let calls = recorder.calls.lock().expect("calls lock");
        assert_eq!(calls.as_slice(), &[("rust".to_string(), SearchMode::Exact, RESULT_LIMIT)]);
    }

    #[test]
    fn both_backends_produce_the_same_bookmark_shape() {
        let store = SqliteBookmarkStore::open_in_memory().expect("store");
        let saved = store
            .new_bookmark(
                &Bookmark::new("Rust Book", "https://doc.rust-lang.org/book")
                    .with_description("the official guide")
                    .with_project("work.research")
                    .with_tags(["rust"]),
            )
            .expect("insert");

        let temp = tempdir().expect("tempdir");
        let index = Arc::new(
            DocumentIndex::open_or_create(temp.path(), Duration::from_secs(5)).expect("index"),
        );
        index.reindex(std::slice::from_ref(&saved)).expect("reindex");

        let sqlite = SearchDispatcher::new(Box::new(SqliteTextSearch::new(store)));
        let tantivy = SearchDispatcher::new(Box::new(DocumentIndexSearch::new(index)));
        assert_eq!(sqlite.backend(), SearchBackend::Sqlite);
        assert_eq!(tantivy.indexed_documents(), Some(1));

        let from_sqlite = sqlite.search("official", SearchMode::Freeform).expect("sqlite");
        let from_index = tantivy.search("official", SearchMode::Freeform).expect("index");
        let (a, b) = (&from_sqlite[0].bookmark, &from_index[0].bookmark);
        assert_eq!(a.id, b.id);
        assert_eq!(a.name(), b.name());
        assert_eq!(a.description(), b.description());
        assert_eq!(a.content, b.content);
        assert_eq!(a.project, b.project);
        assert_eq!(a.archived, b.archived);
        assert_eq!(a.created_at.timestamp(), b.created_at.timestamp());
        // only the store joins tags in
        assert_eq!(a.tags, vec!["rust"]);
        assert!(b.tags.is_empty());
    }

    fn parity_dispatchers() -> (tempfile::TempDir, SearchDispatcher, SearchDispatcher) {
        let store = SqliteBookmarkStore::open_in_memory().expect("store");
        let saved = store
            .import_bookmarks(&[
                Bookmark::new("Rust Book", "https://doc.rust-lang.org/book")
                    .with_description("Learning Rust the official way")
                    .with_project("work.research"),
                Bookmark::new("Rust hosting", "https://github.com/rust-lang")
                    .with_description("mirrors on github.com")
                    .with_project("work"),
                Bookmark::new("Cooking", "https://cooking.example").with_project("home"),
            ])
            .expect("import");
        let temp = tempdir().expect("tempdir");
        let index = Arc::new(
            DocumentIndex::open_or_create(temp.path(), Duration::from_secs(5)).expect("index"),
        );
        index.reindex(&saved).expect("reindex");
        (
            temp,
            SearchDispatcher::new(Box::new(SqliteTextSearch::new(store))),
            SearchDispatcher::new(Box::new(DocumentIndexSearch::new(index))),
        )
    }

    fn sorted_names(dispatcher: &SearchDispatcher, text: &str) -> Vec<String> {
        let mut names = dispatcher
            .search(text, SearchMode::Freeform)
            .unwrap_or_else(|err| panic!("{:?} {text:?}: {err}", dispatcher.backend()))
            .into_iter()
            .map(|hit| hit.bookmark.name().to_string())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn backends_agree_on_freeform_queries() {
        let (_temp, sqlite, tantivy) = parity_dispatchers();
        let cases: [(&str, &[&str]); 5] = [
            ("github.com", &["Rust hosting"]),
            ("rust book", &["Rust Book"]),
            ("rust OR cooking", &["Cooking", "Rust Book", "Rust hosting"]),
            ("\"official way\"", &["Rust Book"]),
            ("work.research", &["Rust Book"]),
        ];
        for (text, expected) in cases {
            assert_eq!(sorted_names(&sqlite, text), expected, "sqlite {text:?}");
            assert_eq!(sorted_names(&tantivy, text), expected, "index {text:?}");
        }
    }

    #[test]
    fn backend_errors_surface_as_search_errors() {
        let store = SqliteBookmarkStore::open_in_memory().expect("store");
        let dispatcher = SearchDispatcher::new(Box::new(SqliteTextSearch::new(store)));
        let err = dispatcher
            .search("\"open", SearchMode::Freeform)
            .expect_err("syntax");
        assert!(matches!(err, BookmarkerError::SearchQuery(_)));
    }
}
