// Every fallible API in this crate returns `BookmarkerError`.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod client;
pub mod config;
pub mod error;
pub mod external;
pub mod index;
pub mod models;
pub mod project;
pub mod query;
pub mod search;
pub mod state;

pub use client::Bookmarker;
pub use config::{AppConfig, SearchBackend};
pub use error::{BookmarkerError, ErrorPayload, Result};
pub use models::{Bookmark, FilterResult, QueryOutcome, SearchHit, Statistics, TagCount};
pub use project::{ProjectForest, ProjectId, ProjectTree, parse_trees};
pub use query::{Filter, Modifier, Predicate};
pub use search::SearchMode;
pub use state::SqliteBookmarkStore;
