use tracing::{debug, info};

use crate::error::{BookmarkerError, Result};
use crate::external::{BookmarkSource, PageTitleFetcher};
use crate::models::Bookmark;

use super::Bookmarker;

impl Bookmarker {
    /// Unsaved bookmark with an empty entry for every configured default
    /// metadata field.
    #[must_use]
    pub fn blank_bookmark(&self, name: &str, content: &str) -> Bookmark {
        let mut bookmark = Bookmark::new(name, content);
        bookmark.fill_default_metadata(&self.config.default_metadata_fields);
        bookmark
    }

    pub fn new_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark> {
        let saved = self.store.new_bookmark(bookmark)?;
        if let Some(index) = self.document_index() {
            index.index_bookmark(&saved)?;
        }
        Ok(saved)
    }

    pub fn update_bookmark(&self, bookmark: &Bookmark) -> Result<Bookmark> {
        let saved = self.store.update_bookmark(bookmark)?;
        if let Some(index) = self.document_index() {
            index.index_bookmark(&saved)?;
        }
        Ok(saved)
    }

    /// Returns false when no bookmark had that id.
    pub fn delete_bookmark(&self, id: i64) -> Result<bool> {
        let removed = self.store.delete_bookmark(id)?;
        if removed && let Some(index) = self.document_index() {
            index.remove_bookmark(id)?;
        }
        Ok(removed)
    }

    pub fn get_bookmark(&self, id: i64) -> Result<Bookmark> {
        self.store
            .get_bookmark(id)?
            .ok_or_else(|| BookmarkerError::NotFound(format!("bookmark {id}")))
    }

    /// Stores every record in one transaction; nothing is kept if any insert
    /// fails.
    pub fn import_bookmarks(&self, bookmarks: &[Bookmark]) -> Result<Vec<Bookmark>> {
        let saved = self.store.import_bookmarks(bookmarks)?;
        self.mirror_all()?;
        info!(count = saved.len(), "imported bookmarks");
        Ok(saved)
    }

    pub fn import_from(&self, source: &dyn BookmarkSource) -> Result<Vec<Bookmark>> {
        let records = source.read_bookmarks()?;
        self.import_bookmarks(&records)
    }

    /// Distinct stored values for `key` containing `value`, capped at the
    /// configured autocomplete size.
    pub fn search_key_value(&self, key: &str, value: &str) -> Result<Vec<String>> {
        self.store
            .search_key_value(key, value, self.config.autocomplete_max_results)
    }

    /// Sets the bookmark's name from the page title when the name is blank.
    /// Returns whether the name changed. The bookmark is not saved.
    pub fn fill_page_title(
        &self,
        bookmark: &mut Bookmark,
        fetcher: &dyn PageTitleFetcher,
    ) -> Result<bool> {
        if !bookmark.name().trim().is_empty() {
            return Ok(false);
        }
        let Some(title) = fetcher.fetch_title(&bookmark.content)? else {
            debug!(content = %bookmark.content, "page has no title");
            return Ok(false);
        };
        bookmark.set_name(title);
        Ok(true)
    }
}
