//! The bookmark query language.
//!
//! A query is a space-separated list of `key:value` tokens plus at most one
//! bare word. Bare words switch the filter to plain full-text mode; keyed
//! tokens become field predicates that [`compile`] turns into SQL.

mod compile;
mod filter;
mod modifier;
mod tokenize;

pub(crate) use compile::{BOOKMARK_ROW_COLUMNS, escape_like};
pub use compile::{
    CompiledQuery, RESULT_LIMIT, SqlParam, compile, compile_bulk_update, compile_projects,
};
pub use filter::{Filter, Predicate};
pub use modifier::Modifier;
pub use tokenize::{PredicateToken, QUERY_KEY, Tokens, tokenize};

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
