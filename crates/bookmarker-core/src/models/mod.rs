mod bookmark;
mod search;
mod statistics;

pub use bookmark::{Bookmark, UNSAVED_ID};
pub use search::{FilterResult, QueryOutcome, SearchHit};
pub use statistics::{Statistics, TagCount};
