use std::collections::BTreeMap;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use crate::error::{BookmarkerError, Result};
use crate::models::{Bookmark, SearchHit};
use crate::query::BOOKMARK_ROW_COLUMNS;

use super::SqliteBookmarkStore;
use super::rows::{bookmark_from_row, load_metadata};

// snippet() wraps matches in control characters that never occur in stored
// text, so a literal `[` in a column cannot pass for a highlight.
const MARK_OPEN: char = '\u{2}';
const MARK_CLOSE: char = '\u{3}';

const BOOKMARK_FTS_COLUMNS: [&str; 4] = ["name", "description", "content", "project"];

const BOOKMARK_MATCH_SQL: &str = r"
    SELECT
      rowid,
      bm25(bookmark_fts),
      snippet(bookmark_fts, 0, char(2), char(3), '...', 16),
      snippet(bookmark_fts, 1, char(2), char(3), '...', 16),
      snippet(bookmark_fts, 2, char(2), char(3), '...', 16),
      snippet(bookmark_fts, 3, char(2), char(3), '...', 16)
    FROM bookmark_fts
    WHERE bookmark_fts MATCH ?1
    ORDER BY bm25(bookmark_fts)
    LIMIT ?2
";

const METADATA_MATCH_SQL: &str = r"
    SELECT
      CAST(bookmark AS INTEGER),
      bm25(metadata_fts),
      key,
      snippet(metadata_fts, 2, char(2), char(3), '...', 16)
    FROM metadata_fts
    WHERE metadata_fts MATCH ?1
    ORDER BY bm25(metadata_fts)
    LIMIT ?2
";

#[derive(Debug)]
struct FtsMatch {
    id: i64,
    rank: f64,
    fragments: BTreeMap<String, String>,
}

impl SqliteBookmarkStore {
    /// Runs an FTS5 match expression against the bookmark and metadata text
    /// indexes. Hits are merged per bookmark, best rank first; tags come from
    /// the live tag relation.
    pub fn full_text_search(&self, expression: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let sql_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut matches = bookmark_matches(conn, expression, sql_limit).map_err(match_error)?;
            match metadata_matches(conn, expression, sql_limit) {
                Ok(found) => merge_matches(&mut matches, found),
                // column filters name bookmark columns the metadata index lacks
                Err(err) if is_missing_column(&err) => {
                    debug!(error = %err, "metadata index skipped for column-scoped query");
                }
                Err(err) => return Err(match_error(err)),
            }
            matches.sort_by(|a, b| a.rank.total_cmp(&b.rank).then(a.id.cmp(&b.id)));
            matches.truncate(limit);

            let mut hits = Vec::with_capacity(matches.len());
            for found in matches {
                let Some(mut bookmark) = bookmark_by_id(conn, found.id)? else {
                    debug!(id = found.id, "text index refers to a missing bookmark");
                    continue;
                };
                load_metadata(conn, &mut bookmark)?;
                #[allow(clippy::cast_possible_truncation)]
                let score = -found.rank as f32;
                hits.push(SearchHit {
                    bookmark,
                    score,
                    fragments: found.fragments,
                });
            }
            Ok(hits)
        })
    }
}

fn bookmark_matches(conn: &Connection, expression: &str, limit: i64) -> rusqlite::Result<Vec<FtsMatch>> {
    let mut stmt = conn.prepare_cached(BOOKMARK_MATCH_SQL)?;
    let rows = stmt.query_map(params![expression, limit], |row| {
        let mut fragments = BTreeMap::new();
        for (idx, field) in BOOKMARK_FTS_COLUMNS.iter().enumerate() {
            if let Some(fragment) = highlighted(row.get(idx + 2)?) {
                fragments.insert((*field).to_string(), fragment);
            }
        }
        Ok(FtsMatch {
            id: row.get(0)?,
            rank: row.get(1)?,
            fragments,
        })
    })?;
    rows.collect()
}

fn metadata_matches(conn: &Connection, expression: &str, limit: i64) -> rusqlite::Result<Vec<FtsMatch>> {
    let mut stmt = conn.prepare_cached(METADATA_MATCH_SQL)?;
    let rows = stmt.query_map(params![expression, limit], |row| {
        let key = row.get::<_, String>(2)?;
        let mut fragments = BTreeMap::new();
        if let Some(fragment) = highlighted(row.get(3)?) {
            fragments.insert(format!("metadata.{key}"), fragment);
        }
        Ok(FtsMatch {
            id: row.get(0)?,
            rank: row.get(1)?,
            fragments,
        })
    })?;
    rows.collect()
}

/// Keeps a snippet only when it marks a match, rendering marks as `[..]`.
fn highlighted(fragment: Option<String>) -> Option<String> {
    let fragment = fragment?;
    if !fragment.contains(MARK_OPEN) {
        return None;
    }
    Some(fragment.replace(MARK_OPEN, "[").replace(MARK_CLOSE, "]"))
}

fn merge_matches(matches: &mut Vec<FtsMatch>, found: Vec<FtsMatch>) {
    for candidate in found {
        match matches.iter_mut().find(|existing| existing.id == candidate.id) {
            Some(existing) => {
                existing.rank = existing.rank.min(candidate.rank);
                existing.fragments.extend(candidate.fragments);
            }
            None => matches.push(candidate),
        }
    }
}

fn bookmark_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Bookmark>> {
    let sql = format!("SELECT{BOOKMARK_ROW_COLUMNS}\nFROM bookmarks b\nWHERE b.id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.query_row(params![id], bookmark_from_row).optional()
}

/// Generic SQLite errors raised while matching are query-language errors;
/// anything else is a store failure.
fn match_error(err: rusqlite::Error) -> BookmarkerError {
    match &err {
        rusqlite::Error::SqliteFailure(code, Some(message)) if code.code == ErrorCode::Unknown => {
            BookmarkerError::SearchQuery(message.clone())
        }
        _ => err.into(),
    }
}

fn is_missing_column(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains("no such column")
    )
}
