use std::path::Path;

use anyhow::{Context, Result};
use bookmarker_core::external::HttpTitleFetcher;
use bookmarker_core::{AppConfig, Bookmarker, BookmarkerError};
use tracing::debug;

use crate::cli::Commands;

mod support;

use self::support::{build_bookmark, build_modifier, print_json};

pub(crate) fn run_from_root(root: &Path, command: Commands) -> Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = Bookmarker::open(root, config)
        .with_context(|| format!("failed to open catalog at {}", root.display()))?;
    run(&app, command)
}

fn run(app: &Bookmarker, command: Commands) -> Result<()> {
    debug!(operation = command.name(), "running command");
    match command {
        Commands::Filter(args) => {
            let filter = app.new_filter(&args.query)?;
            print_json(&app.filter_bookmarks(&filter)?)?;
        }
        Commands::Search(args) => {
            print_json(&app.search_bookmarks(&args.text, args.exact)?)?;
        }
        Commands::Query(args) => {
            print_json(&app.query(&args.query)?)?;
        }
        Commands::Projects(args) => {
            let forest = match args.query.as_deref() {
                Some(query) => app.filter_projects(&app.new_filter(query)?)?,
                None => app.get_all_projects()?,
            };
            if args.print {
                print!("{}", forest.print_tree());
            } else {
                print_json(&forest.to_trees())?;
            }
        }
        Commands::Modify(args) => {
            let filter = app.new_filter(&args.query)?;
            let modifier = build_modifier(&args.set)?;
            let changed = app.bulk_modify(&filter, &modifier)?;
            print_json(&serde_json::json!({
                "status": "ok",
                "query": args.query,
                "changed": changed,
            }))?;
        }
        Commands::Add(args) => {
            let mut bookmark = build_bookmark(app, &args)?;
            if args.fetch_title {
                let fetcher = HttpTitleFetcher::new()?;
                app.fill_page_title(&mut bookmark, &fetcher)?;
            }
            print_json(&app.new_bookmark(&bookmark)?)?;
        }
        Commands::Get(args) => {
            print_json(&app.get_bookmark(args.id)?)?;
        }
        Commands::Rm(args) => {
            let removed = app.delete_bookmark(args.id)?;
            print_json(&serde_json::json!({
                "status": if removed { "ok" } else { "not_found" },
                "id": args.id,
            }))?;
        }
        Commands::Tags => {
            print_json(&app.get_tags()?)?;
        }
        Commands::Stats => {
            print_json(&app.get_statistics()?)?;
        }
        Commands::Autocomplete(args) => {
            print_json(&app.search_key_value(&args.key, &args.value)?)?;
        }
        Commands::Index => {
            let documents = app.index_fts()?;
            print_json(&serde_json::json!({
                "status": "ok",
                "documents": documents,
            }))?;
        }
    }
    Ok(())
}

/// Catalog errors become a JSON payload on stderr; anything else is printed
/// with its context chain.
pub(crate) fn report_error(operation: &str, err: &anyhow::Error) {
    match err.downcast_ref::<BookmarkerError>() {
        Some(core) => match serde_json::to_string_pretty(&core.to_payload(operation)) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!("error: {core}"),
        },
        None => eprintln!("error: {err:#}"),
    }
}
