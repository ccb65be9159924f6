use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::{debug, warn};

use crate::error::{BookmarkerError, Result};
use crate::models::{Bookmark, FilterResult, Statistics, TagCount};
use crate::query::{BOOKMARK_ROW_COLUMNS, CompiledQuery, escape_like};

use super::SqliteBookmarkStore;
use super::rows::{bookmark_from_row, count_to_u64, load_metadata, write_metadata, write_tags};

impl SqliteBookmarkStore {
    /// Inserts a new bookmark with its tags and metadata and returns the
    /// stored copy.
    pub fn new_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark> {
        self.with_tx(|tx| {
            let saved = insert_bookmark(tx, bookmark)?;
            debug!(id = saved.id, "created bookmark");
            Ok(saved)
        })
    }

    /// Rewrites a stored bookmark, including its tag and metadata relations,
    /// in one transaction. `updated_at` is set to now.
    pub fn update_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark> {
        if !bookmark.is_saved() {
            return Err(BookmarkerError::Validation(
                "cannot update a bookmark that was never saved".to_string(),
            ));
        }
        let mut saved = bookmark.clone();
        saved.updated_at = Utc::now();
        self.with_tx(|tx| {
            let changed = tx.execute(
                r"
                UPDATE bookmarks SET
                  name = ?2,
                  lower_name = ?3,
                  description = ?4,
                  description_lower = ?5,
                  content = ?6,
                  project = ?7,
                  updated_at = ?8,
                  archived = ?9
                WHERE id = ?1
                ",
                params![
                    saved.id,
                    saved.name(),
                    saved.lower_name(),
                    saved.description(),
                    saved.description_lower(),
                    saved.content,
                    saved.project,
                    saved.updated_at.to_rfc3339(),
                    saved.archived,
                ],
            )?;
            if changed == 0 {
                return Err(BookmarkerError::NotFound(format!("bookmark {}", saved.id)));
            }
            write_tags(tx, saved.id, &saved.tags)?;
            write_metadata(tx, &saved)?;
            Ok(())
        })?;
        Ok(saved)
    }

    pub fn delete_bookmark(&self, id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            let removed = tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }

    pub fn get_bookmark(&self, id: i64) -> Result<Option<Bookmark>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT{BOOKMARK_ROW_COLUMNS}\nFROM bookmarks b\nWHERE b.id = ?1");
            let bookmark = conn
                .query_row(&sql, params![id], bookmark_from_row)
                .optional()?;
            match bookmark {
                Some(mut bookmark) => {
                    load_metadata(conn, &mut bookmark)?;
                    Ok(Some(bookmark))
                }
                None => Ok(None),
            }
        })
    }

    /// Every stored bookmark ordered by name. Used for reindexing.
    pub fn all_bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT{BOOKMARK_ROW_COLUMNS}\nFROM bookmarks b\nORDER BY b.lower_name ASC, b.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], bookmark_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                let mut bookmark = row?;
                load_metadata(conn, &mut bookmark)?;
                out.push(bookmark);
            }
            Ok(out)
        })
    }

    pub fn bookmark_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))?;
            Ok(count_to_u64(count))
        })
    }

    /// Inserts a batch in one transaction. The first failure rolls back the
    /// whole batch and is returned.
    pub fn import_bookmarks(&self, bookmarks: &[Bookmark]) -> Result<Vec<Bookmark>> {
        let saved = self.with_tx(|tx| {
            bookmarks
                .iter()
                .map(|bookmark| insert_bookmark(tx, bookmark))
                .collect::<Result<Vec<_>>>()
        })?;
        debug!(count = saved.len(), "imported bookmarks");
        Ok(saved)
    }

    /// Runs a compiled filter. Rows that cannot be decoded are skipped and
    /// counted.
    pub fn filter_bookmarks(&self, compiled: &CompiledQuery) -> Result<FilterResult> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&compiled.sql)?;
            let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
            let mut result = FilterResult::default();
            while let Some(row) = rows.next()? {
                match bookmark_from_row(row) {
                    Ok(bookmark) => result.bookmarks.push(bookmark),
                    Err(err) => {
                        result.skipped_rows += 1;
                        warn!(error = %err, "skipping unreadable bookmark row");
                    }
                }
            }
            drop(rows);
            for bookmark in &mut result.bookmarks {
                load_metadata(conn, bookmark)?;
            }
            Ok(result)
        })
    }

    /// Executes a compiled bulk update and returns the number of bookmarks
    /// touched.
    pub fn bulk_modify(&self, compiled: &CompiledQuery) -> Result<usize> {
        self.with_tx(|tx| {
            let changed = tx.execute(&compiled.sql, params_from_iter(compiled.params.iter()))?;
            debug!(changed, "bulk modified bookmarks");
            Ok(changed)
        })
    }

    /// `(project, count)` pairs from a compiled project aggregate.
    pub fn project_counts(&self, compiled: &CompiledQuery) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&compiled.sql)?;
            let rows = stmt.query_map(params_from_iter(compiled.params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (project, count) = row?;
                out.push((project, count_to_u64(count)));
            }
            Ok(out)
        })
    }

    /// Tags attached to at least one bookmark, with usage counts.
    pub fn tags(&self) -> Result<Vec<TagCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT t.name, COUNT(bt.bookmark) AS count
                FROM tags t
                JOIN bookmark_tags bt ON bt.tag = t.id
                GROUP BY t.id
                ORDER BY lower(t.name) ASC
                ",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(TagCount {
                    name: row.get(0)?,
                    count: count_to_u64(row.get::<_, i64>(1)?),
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Distinct metadata keys in use, one spelling per case-folded key.
    pub fn metadata_keys(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT MIN(key) FROM metadata GROUP BY key_lower ORDER BY key_lower ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Distinct stored values for `key` containing `value`, for autocomplete.
    pub fn search_key_value(&self, key: &str, value: &str, limit: usize) -> Result<Vec<String>> {
        let pattern = format!("%{}%", escape_like(&value.to_lowercase()));
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT MIN(value)
                FROM metadata
                WHERE key_lower = ?1 AND value_lower LIKE ?2 ESCAPE '\'
                GROUP BY value_lower
                ORDER BY value_lower ASC
                LIMIT ?3
                ",
            )?;
            let rows = stmt.query_map(params![key.to_lowercase(), pattern, limit], |row| {
                row.get::<_, String>(0)
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn statistics(&self) -> Result<Statistics> {
        let metadata_keys = self.metadata_keys()?;
        self.with_conn(|conn| {
            let (bookmarks, archived, projects, last_raw) = conn.query_row(
                r"
                SELECT
                  COUNT(*),
                  COALESCE(SUM(archived), 0),
                  COUNT(DISTINCT CASE WHEN project != '' THEN project END),
                  MAX(created_at)
                FROM bookmarks
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )?;
            let tags = conn.query_row(
                "SELECT COUNT(DISTINCT tag) FROM bookmark_tags",
                [],
                |row| row.get::<_, i64>(0),
            )?;
            let last_bookmark = last_raw
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|ts| ts.with_timezone(&Utc));
            Ok(Statistics {
                bookmarks: count_to_u64(bookmarks),
                archived: count_to_u64(archived),
                projects: count_to_u64(projects),
                tags: count_to_u64(tags),
                last_bookmark,
                full_text_search: true,
                indexed_documents: None,
                metadata_keys,
            })
        })
    }
}

fn insert_bookmark(tx: &rusqlite::Transaction<'_>, bookmark: &Bookmark) -> Result<Bookmark> {
    tx.execute(
        r"
        INSERT INTO bookmarks(
            name, lower_name, description, description_lower, content, project,
            created_at, updated_at, archived
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ",
        params![
            bookmark.name(),
            bookmark.lower_name(),
            bookmark.description(),
            bookmark.description_lower(),
            bookmark.content,
            bookmark.project,
            bookmark.created_at.to_rfc3339(),
            bookmark.updated_at.to_rfc3339(),
            bookmark.archived,
        ],
    )?;
    let mut saved = bookmark.clone();
    saved.id = tx.last_insert_rowid();
    write_tags(tx, saved.id, &saved.tags)?;
    write_metadata(tx, &saved)?;
    Ok(saved)
}
