use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;

#[cfg(test)]
mod tests;

pub use args::{
    AddArgs, AutocompleteArgs, FilterArgs, IdArg, ModifyArgs, ProjectsArgs, SearchArgs,
};

#[derive(Debug, Parser)]
#[command(name = "bookmarker")]
#[command(about = "Query, filter and search a bookmark catalog", version)]
pub struct Cli {
    #[arg(long, default_value = ".bookmarker")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a structured filter such as `project:work tags:rust`.
    Filter(FilterArgs),
    /// Full-text search through the configured backend.
    Search(SearchArgs),
    /// Route a query string to filter or search the way the query bar does.
    Query(FilterArgs),
    /// Print the project forest, optionally restricted by a filter.
    Projects(ProjectsArgs),
    /// Apply `--set key=value` to every bookmark a filter selects.
    Modify(ModifyArgs),
    Add(AddArgs),
    Get(IdArg),
    Rm(IdArg),
    Tags,
    Stats,
    /// Suggest stored values for a metadata key.
    Autocomplete(AutocompleteArgs),
    /// Rebuild the document index from the store.
    Index,
}

impl Commands {
    /// Operation name carried in error payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Search(_) => "search",
            Self::Query(_) => "query",
            Self::Projects(_) => "projects",
            Self::Modify(_) => "modify",
            Self::Add(_) => "add",
            Self::Get(_) => "get",
            Self::Rm(_) => "rm",
            Self::Tags => "tags",
            Self::Stats => "stats",
            Self::Autocomplete(_) => "autocomplete",
            Self::Index => "index",
        }
    }
}
