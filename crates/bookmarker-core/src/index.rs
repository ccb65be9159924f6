use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, INDEXED, STORED, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use crate::error::{BookmarkerError, Result};
use crate::models::{Bookmark, SearchHit};
use crate::search::SearchMode;

const WRITER_MEMORY_BUDGET: usize = 50_000_000;
const META_FILE: &str = "meta.json";

#[derive(Debug, Clone, Copy)]
struct IndexFields {
    id: Field,
    name: Field,
    description: Field,
    content: Field,
    project: Field,
    archived: Field,
    created_at: Field,
    updated_at: Field,
}

impl IndexFields {
    fn schema() -> Schema {
        let mut builder = Schema::builder();
        builder.add_u64_field("id", INDEXED | STORED);
        builder.add_text_field("name", TEXT | STORED);
        builder.add_text_field("description", TEXT | STORED);
        builder.add_text_field("content", TEXT | STORED);
        builder.add_text_field("project", TEXT | STORED);
        builder.add_bool_field("archived", INDEXED | STORED);
        builder.add_date_field("created_at", INDEXED | STORED);
        builder.add_date_field("updated_at", INDEXED | STORED);
        builder.build()
    }

    fn resolve(schema: &Schema) -> Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            name: schema.get_field("name")?,
            description: schema.get_field("description")?,
            content: schema.get_field("content")?,
            project: schema.get_field("project")?,
            archived: schema.get_field("archived")?,
            created_at: schema.get_field("created_at")?,
            updated_at: schema.get_field("updated_at")?,
        })
    }

    fn text_fields(self) -> Vec<Field> {
        vec![self.name, self.description, self.content, self.project]
    }
}

/// Standalone tantivy index holding a denormalized projection of every
/// bookmark: id, name, description, content, project, archived flag and
/// timestamps. Tags are not part of the projection.
///
/// Every write goes through the single writer, acquired with a timeout.
pub struct DocumentIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: IndexFields,
    lock_timeout: Duration,
    path: PathBuf,
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("path", &self.path)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl DocumentIndex {
    pub fn open_or_create(dir: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let directory = MmapDirectory::open(dir).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(directory, IndexFields::schema())?;
        Self::from_index(index, dir, lock_timeout)
    }

    /// Opens an index that must already exist.
    pub fn open_existing(dir: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.join(META_FILE).exists() {
            return Err(BookmarkerError::SearchUnavailable(format!(
                "document index not found at {}",
                dir.display()
            )));
        }
        let index = Index::open_in_dir(dir)?;
        Self::from_index(index, dir, lock_timeout)
    }

    fn from_index(index: Index, dir: &Path, lock_timeout: Duration) -> Result<Self> {
        let fields = IndexFields::resolve(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer: IndexWriter = index.writer(WRITER_MEMORY_BUDGET)?;
        debug!(path = %dir.display(), "opened document index");
        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
            lock_timeout,
            path: dir.to_path_buf(),
        })
    }

    fn lock_writer(&self) -> Result<parking_lot::MutexGuard<'_, IndexWriter>> {
        self.writer
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| BookmarkerError::lock_timeout("document index writer", self.lock_timeout))
    }

    fn document(&self, bookmark: &Bookmark) -> Result<TantivyDocument> {
        let id = u64::try_from(bookmark.id).map_err(|_| {
            BookmarkerError::Validation(format!("cannot index bookmark id {}", bookmark.id))
        })?;
        let mut doc = TantivyDocument::default();
        doc.add_u64(self.fields.id, id);
        doc.add_text(self.fields.name, bookmark.name());
        doc.add_text(self.fields.description, bookmark.description());
        doc.add_text(self.fields.content, &bookmark.content);
        doc.add_text(self.fields.project, &bookmark.project);
        doc.add_bool(self.fields.archived, bookmark.archived);
        doc.add_date(self.fields.created_at, to_index_date(bookmark.created_at));
        doc.add_date(self.fields.updated_at, to_index_date(bookmark.updated_at));
        Ok(doc)
    }

    /// Adds or replaces one bookmark and commits.
    pub fn index_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let doc = self.document(bookmark)?;
        let mut writer = self.lock_writer()?;
        writer.delete_term(self.id_term(bookmark.id));
        writer.add_document(doc)?;
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    pub fn remove_bookmark(&self, id: i64) -> Result<()> {
        let mut writer = self.lock_writer()?;
        writer.delete_term(self.id_term(id));
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        Ok(())
    }

    /// Replaces the whole index with `bookmarks` in one commit and returns the
    /// resulting document count.
    pub fn reindex(&self, bookmarks: &[Bookmark]) -> Result<u64> {
        let docs = bookmarks
            .iter()
            .map(|bookmark| self.document(bookmark))
            .collect::<Result<Vec<_>>>()?;
        let mut writer = self.lock_writer()?;
        writer.delete_all_documents()?;
        for (idx, doc) in docs.into_iter().enumerate() {
            writer.add_document(doc)?;
            debug!(position = idx + 1, "indexed bookmark");
        }
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        let count = self.doc_count();
        info!(documents = count, "document index rebuilt");
        Ok(count)
    }

    /// Runs `text` through tantivy's query language over the text fields.
    /// Bare terms must all match, as they do in FTS5.
    pub fn search(&self, text: &str, mode: SearchMode, limit: usize) -> Result<Vec<SearchHit>> {
        let mut parser = QueryParser::for_index(&self.index, self.fields.text_fields());
        parser.set_conjunction_by_default();
        let query = parser
            .parse_query(&mode.index_query(text))
            .map_err(|err| BookmarkerError::SearchQuery(err.to_string()))?;
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc = searcher.doc::<TantivyDocument>(address)?;
            hits.push(SearchHit {
                bookmark: self.project_hit(&doc),
                score,
                fragments: Default::default(),
            });
        }
        Ok(hits)
    }

    // Tags are left empty; the index does not carry them.
    fn project_hit(&self, doc: &TantivyDocument) -> Bookmark {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let date = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_datetime())
                .and_then(|ts| DateTime::<Utc>::from_timestamp_micros(ts.into_timestamp_micros()))
                .unwrap_or_default()
        };
        let mut bookmark = Bookmark::new(text(self.fields.name), text(self.fields.content))
            .with_description(text(self.fields.description))
            .with_project(text(self.fields.project));
        bookmark.id = doc
            .get_first(self.fields.id)
            .and_then(|v| v.as_u64())
            .and_then(|id| i64::try_from(id).ok())
            .unwrap_or_default();
        bookmark.archived = doc
            .get_first(self.fields.archived)
            .and_then(|v| v.as_bool())
            .unwrap_or_default();
        bookmark.created_at = date(self.fields.created_at);
        bookmark.updated_at = date(self.fields.updated_at);
        bookmark
    }

    #[must_use]
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn id_term(&self, id: i64) -> Term {
        Term::from_field_u64(self.fields.id, u64::try_from(id).unwrap_or_default())
    }
}

fn to_index_date(ts: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_micros(ts.timestamp_micros())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;

    fn saved(id: i64, name: &str, description: &str) -> Bookmark {
        let mut bookmark = Bookmark::new(name, format!("https://example.org/{id}"))
            .with_description(description)
            .with_project("work.research")
            .with_tags(["ignored"]);
        bookmark.id = id;
        bookmark
    }

    fn open(dir: &Path) -> DocumentIndex {
        DocumentIndex::open_or_create(dir, Duration::from_secs(5)).expect("open index")
    }

    #[test]
    fn reindex_replaces_every_document() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        let count = index
            .reindex(&[saved(1, "Rust Book", "learn rust"), saved(2, "Cooking", "pasta")])
            .expect("reindex");
        assert_eq!(count, 2);

        let count = index.reindex(&[saved(3, "Only", "one")]).expect("reindex");
        assert_eq!(count, 1);
        assert_eq!(index.doc_count(), 1);
    }

    #[test]
    fn search_projects_hits_without_tags() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        index
            .reindex(&[saved(1, "Rust Book", "learn rust"), saved(2, "Cooking", "pasta")])
            .expect("reindex");

        let hits = index
            .search("rust", SearchMode::Freeform, 10)
            .expect("search");
        assert_eq!(hits.len(), 1);
        let bookmark = &hits[0].bookmark;
        assert_eq!(bookmark.id, 1);
        assert_eq!(bookmark.name(), "Rust Book");
        assert_eq!(bookmark.project, "work.research");
        assert!(!bookmark.archived);
        assert!(bookmark.tags.is_empty());
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn boolean_operators_pass_through() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        index
            .reindex(&[saved(1, "Rust Book", "learn rust"), saved(2, "Cooking", "pasta")])
            .expect("reindex");
        let hits = index
            .search("rust OR pasta", SearchMode::Freeform, 10)
            .expect("search");
        assert_eq!(hits.len(), 2);
        let hits = index
            .search("research AND NOT pasta", SearchMode::Freeform, 10)
            .expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn bare_terms_must_all_match() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        index
            .reindex(&[saved(1, "Rust Book", "learn rust"), saved(2, "Cooking", "pasta")])
            .expect("reindex");
        assert!(index
            .search("rust pasta", SearchMode::Freeform, 10)
            .expect("search")
            .is_empty());
        let hits = index
            .search("rust learn", SearchMode::Freeform, 10)
            .expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn exact_mode_matches_whole_phrase() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        index
            .reindex(&[saved(1, "Rust Book", ""), saved(2, "Book about Rust", "")])
            .expect("reindex");
        let hits = index
            .search("rust book", SearchMode::Exact, 10)
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bookmark.id, 1);
    }

    #[test]
    fn index_bookmark_replaces_by_id_and_remove_deletes() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        index.index_bookmark(&saved(7, "First", "")).expect("index");
        index.index_bookmark(&saved(7, "Second", "")).expect("reindex one");
        assert_eq!(index.doc_count(), 1);
        let hits = index
            .search("second", SearchMode::Freeform, 10)
            .expect("search");
        assert_eq!(hits.len(), 1);

        index.remove_bookmark(7).expect("remove");
        assert_eq!(index.doc_count(), 0);
    }

    #[test]
    fn missing_index_is_unavailable() {
        let temp = tempdir().expect("tempdir");
        let err = DocumentIndex::open_existing(temp.path().join("absent"), Duration::from_secs(1))
            .expect_err("missing");
        assert!(matches!(err, BookmarkerError::SearchUnavailable(_)));
        assert!(err.is_search_error());
    }

    #[test]
    fn unknown_field_is_a_query_error() {
        let temp = tempdir().expect("tempdir");
        let index = open(temp.path());
        let err = index
            .search("nosuchfield:rust", SearchMode::Freeform, 10)
            .expect_err("bad field");
        assert!(matches!(err, BookmarkerError::SearchQuery(_)));
    }
}
