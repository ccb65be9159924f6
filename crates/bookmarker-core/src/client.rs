use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, SearchBackend};
use crate::error::Result;
use crate::index::DocumentIndex;
use crate::search::{DocumentIndexSearch, SearchDispatcher, SqliteTextSearch};
use crate::state::SqliteBookmarkStore;

mod bookmark_service;
mod catalog_service;
mod search_service;
mod stats_service;

pub const DATABASE_FILE: &str = "bookmarker.sqlite3";
pub const INDEX_DIR: &str = "bookmarker.index";

/// Entry point for the presentation layer.
///
/// Owns the bookmark store and, when the document-index backend is selected,
/// the tantivy index. Both stay open for the lifetime of the value.
pub struct Bookmarker {
    pub store: SqliteBookmarkStore,
    index: Option<Arc<DocumentIndex>>,
    search: SearchDispatcher,
    config: AppConfig,
    root: PathBuf,
}

impl std::fmt::Debug for Bookmarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bookmarker")
            .field("root", &self.root)
            .field("backend", &self.search.backend())
            .finish_non_exhaustive()
    }
}

impl Bookmarker {
    pub fn open(root_dir: impl Into<PathBuf>, config: AppConfig) -> Result<Self> {
        let root = root_dir.into();
        fs::create_dir_all(&root)?;
        let store = SqliteBookmarkStore::open_with_timeout(
            root.join(DATABASE_FILE),
            config.store_timeout,
        )?;

        let (index, search) = match config.search_backend {
            SearchBackend::Sqlite => {
                let search = SearchDispatcher::new(Box::new(SqliteTextSearch::new(store.clone())));
                (None, search)
            }
            SearchBackend::DocumentIndex => {
                let index = Arc::new(DocumentIndex::open_or_create(
                    root.join(INDEX_DIR),
                    config.index_timeout,
                )?);
                sync_index(&store, &index)?;
                let search =
                    SearchDispatcher::new(Box::new(DocumentIndexSearch::new(Arc::clone(&index))));
                (Some(index), search)
            }
        };
        info!(
            root = %root.display(),
            backend = config.search_backend.as_str(),
            "bookmarker opened"
        );

        Ok(Self {
            store,
            index,
            search,
            config,
            root,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Rebuilds the index when it does not hold one document per stored bookmark,
/// which covers a freshly created index and writes made under the SQLite
/// backend.
fn sync_index(store: &SqliteBookmarkStore, index: &DocumentIndex) -> Result<()> {
    let stored = store.bookmark_count()?;
    let indexed = index.doc_count();
    if stored != indexed {
        info!(stored, indexed, "document index out of date, rebuilding");
        index.reindex(&store.all_bookmarks()?)?;
    }
    Ok(())
}
