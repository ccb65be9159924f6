use super::*;
use clap::Parser;

#[test]
fn filter_defaults_to_empty_query() {
    let cli = Cli::try_parse_from(["bookmarker", "filter"]).expect("parse");
    match cli.command {
        Commands::Filter(FilterArgs { query }) => assert!(query.is_empty()),
        _ => panic!("expected filter command"),
    }
    assert_eq!(cli.root, PathBuf::from(".bookmarker"));
}

#[test]
fn search_parses_exact_flag() {
    let cli =
        Cli::try_parse_from(["bookmarker", "search", "rust book", "--exact"]).expect("parse");
    match cli.command {
        Commands::Search(SearchArgs { text, exact }) => {
            assert_eq!(text, "rust book");
            assert!(exact);
        }
        _ => panic!("expected search command"),
    }
}

#[test]
fn modify_requires_at_least_one_assignment() {
    let parsed = Cli::try_parse_from(["bookmarker", "modify", "project:work"]);
    assert!(parsed.is_err(), "modify without --set must be rejected");

    let cli = Cli::try_parse_from([
        "bookmarker",
        "modify",
        "project:work",
        "--set",
        "archived=true",
        "--set",
        "project=old.work",
    ])
    .expect("parse");
    match cli.command {
        Commands::Modify(ModifyArgs { query, set }) => {
            assert_eq!(query, "project:work");
            assert_eq!(set, vec!["archived=true", "project=old.work"]);
        }
        _ => panic!("expected modify command"),
    }
}

#[test]
fn add_collects_repeated_tags_and_metadata() {
    let cli = Cli::try_parse_from([
        "bookmarker",
        "--root",
        "/tmp/catalog",
        "add",
        "--link",
        "https://example.com",
        "--tag",
        "a",
        "--tag",
        "b",
        "--meta",
        "Author=Ann",
    ])
    .expect("parse");
    assert_eq!(cli.root, PathBuf::from("/tmp/catalog"));
    match cli.command {
        Commands::Add(args) => {
            assert_eq!(args.tags, vec!["a", "b"]);
            assert_eq!(args.metadata, vec!["Author=Ann"]);
            assert!(args.name.is_empty());
            assert!(!args.fetch_title);
        }
        _ => panic!("expected add command"),
    }
}
