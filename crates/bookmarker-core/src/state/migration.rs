use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::error::{BookmarkerError, Result};

use super::SqliteBookmarkStore;

/// Latest schema version this build knows how to apply.
pub const SCHEMA_VERSION: i64 = 2;

const SCHEMAS_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS schemas (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL,
        success INTEGER NOT NULL
    );
";

const V1_CATALOG_SQL: &str = r"
    CREATE TABLE bookmarks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        lower_name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        description_lower TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        project TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        archived INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX idx_bookmarks_lower_name ON bookmarks(lower_name);
    CREATE INDEX idx_bookmarks_project ON bookmarks(project);

    CREATE TABLE tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE bookmark_tags (
        bookmark INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (bookmark, tag),
        FOREIGN KEY (bookmark) REFERENCES bookmarks(id) ON DELETE CASCADE,
        FOREIGN KEY (tag) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_bookmark_tags_tag ON bookmark_tags(tag);

    CREATE TABLE metadata (
        bookmark INTEGER NOT NULL,
        key TEXT NOT NULL,
        key_lower TEXT NOT NULL,
        value TEXT NOT NULL,
        value_lower TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (bookmark, key_lower),
        FOREIGN KEY (bookmark) REFERENCES bookmarks(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_metadata_key_lower ON metadata(key_lower);
";

// Both text indexes store their own copy of the mirrored columns, so the
// triggers below are the only thing keeping them current.
const V2_FULL_TEXT_SQL: &str = r"
    CREATE VIRTUAL TABLE bookmark_fts USING fts5(
        name,
        description,
        content,
        project,
        tokenize = 'unicode61 remove_diacritics 2'
    );

    CREATE VIRTUAL TABLE metadata_fts USING fts5(
        bookmark UNINDEXED,
        key,
        value,
        tokenize = 'unicode61 remove_diacritics 2'
    );

    INSERT INTO bookmark_fts(rowid, name, description, content, project)
    SELECT id, name, description, content, project FROM bookmarks;

    INSERT INTO metadata_fts(bookmark, key, value)
    SELECT bookmark, key, value FROM metadata;

    CREATE TRIGGER bookmarks_fts_insert AFTER INSERT ON bookmarks BEGIN
        INSERT INTO bookmark_fts(rowid, name, description, content, project)
        VALUES (new.id, new.name, new.description, new.content, new.project);
    END;

    CREATE TRIGGER bookmarks_fts_update AFTER UPDATE ON bookmarks BEGIN
        DELETE FROM bookmark_fts WHERE rowid = old.id;
        INSERT INTO bookmark_fts(rowid, name, description, content, project)
        VALUES (new.id, new.name, new.description, new.content, new.project);
    END;

    CREATE TRIGGER bookmarks_fts_delete AFTER DELETE ON bookmarks BEGIN
        DELETE FROM bookmark_fts WHERE rowid = old.id;
    END;

    CREATE TRIGGER metadata_fts_insert AFTER INSERT ON metadata BEGIN
        INSERT INTO metadata_fts(bookmark, key, value)
        VALUES (new.bookmark, new.key, new.value);
    END;

    CREATE TRIGGER metadata_fts_update AFTER UPDATE ON metadata BEGIN
        DELETE FROM metadata_fts WHERE bookmark = old.bookmark AND key = old.key;
        INSERT INTO metadata_fts(bookmark, key, value)
        VALUES (new.bookmark, new.key, new.value);
    END;

    CREATE TRIGGER metadata_fts_delete AFTER DELETE ON metadata BEGIN
        DELETE FROM metadata_fts WHERE bookmark = old.bookmark AND key = old.key;
    END;
";

const MIGRATIONS: [(i64, &str); 2] = [(1, V1_CATALOG_SQL), (2, V2_FULL_TEXT_SQL)];

impl SqliteBookmarkStore {
    /// Applies every schema version newer than the recorded one.
    ///
    /// A version recorded as failed blocks all further migrations until the
    /// database is repaired by hand.
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self
            .conn
            .try_lock_for(self.timeout)
            .ok_or_else(|| BookmarkerError::lock_timeout("sqlite", self.timeout))?;
        conn.execute_batch(SCHEMAS_TABLE_SQL)?;
        if let Some(version) = failed_version(&conn)? {
            return Err(BookmarkerError::Validation(format!(
                "schema migration {version} failed previously; repair or reset the bookmark database"
            )));
        }

        let current = current_version(&conn)?;
        for (version, sql) in MIGRATIONS {
            if version <= current {
                continue;
            }
            let applied = conn.transaction().and_then(|tx| {
                tx.execute_batch(sql)?;
                record_version(&tx, version, true)?;
                tx.commit()
            });
            if let Err(err) = applied {
                warn!(version, error = %err, "schema migration failed");
                record_version(&conn, version, false)?;
                return Err(err.into());
            }
            info!(version, "applied schema migration");
        }
        drop(conn);
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(current_version)
    }
}

fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schemas WHERE success = 1",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(version)
}

fn failed_version(conn: &Connection) -> Result<Option<i64>> {
    let version = conn
        .query_row(
            "SELECT version FROM schemas WHERE success = 0 ORDER BY version ASC LIMIT 1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(version)
}

fn record_version(conn: &Connection, version: i64, success: bool) -> rusqlite::Result<usize> {
    conn.execute(
        r"
        INSERT INTO schemas(version, applied_at, success)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(version) DO UPDATE SET
          applied_at = excluded.applied_at,
          success = excluded.success
        ",
        params![version, Utc::now().to_rfc3339(), success],
    )
}
