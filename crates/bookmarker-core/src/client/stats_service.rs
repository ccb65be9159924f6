use crate::error::Result;
use crate::models::{Statistics, TagCount};

use super::Bookmarker;

impl Bookmarker {
    pub fn get_statistics(&self) -> Result<Statistics> {
        let mut stats = self.store.statistics()?;
        stats.indexed_documents = self.search.indexed_documents();
        Ok(stats)
    }

    pub fn get_tags(&self) -> Result<Vec<TagCount>> {
        self.store.tags()
    }
}
