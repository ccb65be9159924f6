use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::models::{FilterResult, QueryOutcome};
use crate::project::{ProjectForest, parse_trees};
use crate::query::{Filter, Modifier, compile, compile_bulk_update, compile_projects};
use crate::search::SearchMode;

use super::Bookmarker;

impl Bookmarker {
    pub fn new_filter(&self, text: &str) -> Result<Filter> {
        Filter::parse(text)
    }

    /// Runs a structured filter against the store. With `hide_archived` on,
    /// a filter that says nothing about archival only sees live bookmarks.
    pub fn filter_bookmarks(&self, filter: &Filter) -> Result<FilterResult> {
        let filter = self.scoped(filter);
        let compiled = compile(&filter)?;
        let result = self.store.filter_bookmarks(&compiled)?;
        debug!(
            rows = result.bookmarks.len(),
            skipped = result.skipped_rows,
            "filtered bookmarks"
        );
        Ok(result)
    }

    /// Project forest restricted to the bookmarks `filter` selects.
    pub fn filter_projects(&self, filter: &Filter) -> Result<ProjectForest> {
        let filter = self.scoped(filter);
        self.project_forest(&filter)
    }

    /// Every project path, archived bookmarks included.
    pub fn get_all_projects(&self) -> Result<ProjectForest> {
        self.project_forest(&Filter::default())
    }

    fn project_forest(&self, filter: &Filter) -> Result<ProjectForest> {
        let compiled = compile_projects(filter)?;
        let (paths, counts): (Vec<_>, Vec<_>) =
            self.store.project_counts(&compiled)?.into_iter().unzip();
        Ok(parse_trees(&paths, &counts))
    }

    #[must_use]
    pub fn parse_trees<S: AsRef<str>>(&self, paths: &[S], counts: &[u64]) -> ProjectForest {
        parse_trees(paths, counts)
    }

    /// Applies `modifier` to every bookmark the filter's named predicates
    /// select and returns how many changed.
    pub fn bulk_modify(&self, filter: &Filter, modifier: &Modifier) -> Result<usize> {
        let compiled = compile_bulk_update(filter, modifier, Utc::now())?;
        let changed = self.store.bulk_modify(&compiled)?;
        if changed > 0 {
            self.mirror_all()?;
        }
        Ok(changed)
    }

    /// Parses `text` and routes it: free text to full-text search, anything
    /// structured to the store. Parse errors are returned as is.
    pub fn query(&self, text: &str) -> Result<QueryOutcome> {
        let filter = Filter::parse(text)?;
        if filter.is_plain_query() {
            let hits = self.search(filter.query.as_deref().unwrap_or_default(), SearchMode::Freeform)?;
            return Ok(QueryOutcome::Searched { hits });
        }
        Ok(QueryOutcome::Filtered(self.filter_bookmarks(&filter)?))
    }

    fn scoped(&self, filter: &Filter) -> Filter {
        if self.config.hide_archived {
            filter.clone().hide_archived_by_default()
        } else {
            filter.clone()
        }
    }
}
