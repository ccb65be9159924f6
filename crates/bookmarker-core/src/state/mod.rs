use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use crate::error::{BookmarkerError, Result};

mod bookmarks;
mod fts;
mod migration;
mod rows;

pub use migration::SCHEMA_VERSION;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed bookmark store.
///
/// One connection is shared behind a mutex. Lock acquisition and SQLite's own
/// busy handler are both bounded by the configured timeout.
#[derive(Clone)]
pub struct SqliteBookmarkStore {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl std::fmt::Debug for SqliteBookmarkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBookmarkStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SqliteBookmarkStore {
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .try_lock_for(self.timeout)
            .ok_or_else(|| BookmarkerError::lock_timeout("sqlite", self.timeout))?;
        f(&conn)
    }

    /// Runs `f` inside one transaction. Any error rolls the transaction back
    /// when it is dropped.
    fn with_tx<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .try_lock_for(self.timeout)
            .ok_or_else(|| BookmarkerError::lock_timeout("sqlite", self.timeout))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_TIMEOUT)
    }

    pub fn open_with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn, timeout)?;
        #[cfg(unix)]
        harden_sqlite_permissions(path)?;
        debug!(path = %path.display(), "opened bookmark store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, DEFAULT_TIMEOUT)
    }

    fn from_connection(conn: Connection, timeout: Duration) -> Result<Self> {
        conn.busy_timeout(timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        if !full_text_search_supported(&conn)? {
            return Err(BookmarkerError::SearchUnavailable(
                "sqlite was built without FTS5".to_string(),
            ));
        }
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        };
        store.migrate()?;
        Ok(store)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn full_text_search_supported(conn: &Connection) -> Result<bool> {
    let enabled = conn.query_row(
        "SELECT sqlite_compileoption_used('ENABLE_FTS5')",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(enabled == 1)
}

#[cfg(unix)]
fn harden_sqlite_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for suffix in ["", "-wal", "-shm"] {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        let candidate = PathBuf::from(os);
        if candidate.exists() {
            std::fs::set_permissions(candidate, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}
