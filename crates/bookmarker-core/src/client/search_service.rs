use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::index::DocumentIndex;
use crate::models::{Bookmark, SearchHit};
use crate::search::SearchMode;

use super::{Bookmarker, INDEX_DIR};

impl Bookmarker {
    /// Free-text search through the configured backend. `exact` treats the
    /// whole text as one phrase.
    pub fn search_bookmarks(&self, text: &str, exact: bool) -> Result<Vec<Bookmark>> {
        let hits = self.search(text, SearchMode::from_exact(exact))?;
        Ok(hits.into_iter().map(|hit| hit.bookmark).collect())
    }

    pub fn search(&self, text: &str, mode: SearchMode) -> Result<Vec<SearchHit>> {
        self.search.search(text, mode)
    }

    /// Rebuilds the document index from every stored bookmark and returns its
    /// document count. Works whichever backend is active.
    pub fn index_fts(&self) -> Result<u64> {
        let bookmarks = self.store.all_bookmarks()?;
        let count = match &self.index {
            Some(index) => index.reindex(&bookmarks)?,
            None => {
                let index = DocumentIndex::open_or_create(
                    self.root.join(INDEX_DIR),
                    self.config.index_timeout,
                )?;
                index.reindex(&bookmarks)?
            }
        };
        info!(bookmarks = bookmarks.len(), documents = count, "indexed bookmarks");
        Ok(count)
    }

    pub(super) fn document_index(&self) -> Option<&Arc<DocumentIndex>> {
        self.index.as_ref()
    }

    /// Re-syncs the document index after a write that touched many rows.
    pub(super) fn mirror_all(&self) -> Result<()> {
        if let Some(index) = self.document_index() {
            index.reindex(&self.store.all_bookmarks()?)?;
        }
        Ok(())
    }
}
