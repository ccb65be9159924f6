use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use crate::models::Bookmark;

/// Separator `group_concat` uses for the tag column.
pub(super) const TAG_SEPARATOR: char = '\u{1f}';

/// Decodes a row shaped by the shared bookmark column list. Metadata is not
/// part of the row; see [`load_metadata`].
pub(super) fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    let mut bookmark = Bookmark::new(
        row.get::<_, String>("name")?,
        row.get::<_, String>("content")?,
    )
    .with_description(row.get::<_, String>("description")?)
    .with_project(row.get::<_, String>("project")?);
    bookmark.id = row.get("id")?;
    bookmark.created_at = parse_timestamp(row, "created_at")?;
    bookmark.updated_at = parse_timestamp(row, "updated_at")?;
    bookmark.archived = row.get::<_, i64>("archived")? != 0;
    bookmark.tags = row
        .get::<_, Option<String>>("tags")?
        .map(|joined| {
            joined
                .split(TAG_SEPARATOR)
                .filter(|tag| !tag.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(bookmark)
}

fn parse_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(column)?;
    let raw = row.get::<_, String>(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(super) fn load_metadata(conn: &Connection, bookmark: &mut Bookmark) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT key, value FROM metadata WHERE bookmark = ?1 ORDER BY position ASC, key_lower ASC",
    )?;
    let rows = stmt.query_map(params![bookmark.id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (key, value) = row?;
        bookmark.set_metadata(key, value);
    }
    Ok(())
}

pub(super) fn write_tags(conn: &Connection, bookmark_id: i64, tags: &[String]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM bookmark_tags WHERE bookmark = ?1",
        params![bookmark_id],
    )?;
    let mut position = 0_i64;
    for tag in tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
        conn.execute(
            "INSERT OR IGNORE INTO tags(name) VALUES (?1)",
            params![tag],
        )?;
        let tag_id = conn.query_row("SELECT id FROM tags WHERE name = ?1", params![tag], |row| {
            row.get::<_, i64>(0)
        })?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO bookmark_tags(bookmark, tag, position) VALUES (?1, ?2, ?3)",
            params![bookmark_id, tag_id, position],
        )?;
        if inserted > 0 {
            position += 1;
        }
    }
    Ok(())
}

/// Replaces the stored metadata with the bookmark's entries. Empty values are
/// not persisted.
pub(super) fn write_metadata(conn: &Connection, bookmark: &Bookmark) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM metadata WHERE bookmark = ?1",
        params![bookmark.id],
    )?;
    let entries = bookmark
        .metadata_entries()
        .filter(|(_, value)| !value.trim().is_empty());
    for (position, (key, value)) in (0_i64..).zip(entries) {
        conn.execute(
            r"
            INSERT INTO metadata(bookmark, key, key_lower, value, value_lower, position)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                bookmark.id,
                key,
                key.to_lowercase(),
                value,
                value.to_lowercase(),
                position
            ],
        )?;
    }
    Ok(())
}

pub(super) fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
