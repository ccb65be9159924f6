use std::{fs, path::PathBuf};

use bookmarker_core::{
    AppConfig, Bookmark, Bookmarker, BookmarkerError, Modifier, QueryOutcome, SearchBackend,
};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

const FIXED_TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

fn fixture() -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("catalog_contract_fixture.json");
    let raw = fs::read_to_string(path).expect("read catalog contract fixture");
    serde_json::from_str(&raw).expect("parse catalog contract fixture")
}

fn fixture_section(raw: &Value, key: &str) -> Value {
    raw.get(key)
        .cloned()
        .unwrap_or_else(|| panic!("missing fixture section: {key}"))
}

fn catalog(backend: SearchBackend) -> (TempDir, Bookmarker) {
    let temp = tempdir().expect("tempdir");
    let app = Bookmarker::open(
        temp.path(),
        AppConfig::default().with_search_backend(backend),
    )
    .expect("open");
    app.import_bookmarks(&[
        Bookmark::new("Rust Book", "https://doc.rust-lang.org/book")
            .with_description("Learning Rust the official way")
            .with_project("work.research")
            .with_tags(["rust", "books"])
            .with_metadata("Author", "Steve Klabnik"),
        Bookmark::new("async book", "https://rust-lang.github.io/async-book")
            .with_project("work.research")
            .with_tags(["rust"])
            .with_metadata("Author", "Various"),
        Bookmark::new("Cooking", "https://cooking.example")
            .with_project("home")
            .with_tags(["food"]),
        Bookmark::new("Old notes", "file:///notes.txt").with_project("work"),
    ])
    .expect("import");
    (temp, app)
}

fn names(outcome: &QueryOutcome) -> Vec<&str> {
    outcome.bookmarks().into_iter().map(Bookmark::name).collect()
}

#[test]
fn project_forest_matches_contract_shape() {
    let raw = fixture();
    let (_temp, app) = catalog(SearchBackend::Sqlite);
    let forest = app.get_all_projects().expect("projects");

    let trees = serde_json::to_value(forest.to_trees()).expect("serialize trees");
    assert_eq!(trees, fixture_section(&raw, "project_trees"));
    assert_eq!(
        Value::String(forest.print_tree()),
        fixture_section(&raw, "printed_tree")
    );

    let work = forest.find("work").expect("work root");
    assert_eq!(forest.total_count(work), 3);
    assert!(forest.failures().is_empty());
}

#[test]
fn parse_error_payload_matches_contract() {
    let raw = fixture();
    let (_temp, app) = catalog(SearchBackend::Sqlite);
    let err = app.query("a:b:c").expect_err("malformed token");
    assert!(matches!(err, BookmarkerError::Parse(_)));

    let mut payload = serde_json::to_value(err.to_payload("query")).expect("serialize payload");
    payload["trace_id"] = Value::String(FIXED_TRACE_ID.to_string());
    assert_eq!(payload, fixture_section(&raw, "error_payload_parse"));
}

#[test]
fn filtered_projects_follow_the_filter() {
    let (_temp, app) = catalog(SearchBackend::Sqlite);
    let filter = app.new_filter("tags:rust").expect("filter");
    let forest = app.filter_projects(&filter).expect("projects");
    let research = forest.find("work.research").expect("research");
    assert_eq!(forest.own_count(research), 2);
    assert!(forest.find("home").is_none());
    let work = forest.find("work").expect("work");
    assert_eq!(forest.own_count(work), 0);
    assert_eq!(forest.total_count(work), 2);
}

#[test]
fn keyed_and_metadata_predicates_union() {
    let (_temp, app) = catalog(SearchBackend::Sqlite);
    let outcome = app.query("name:cooking author:various").expect("query");
    assert_eq!(names(&outcome), vec!["async book", "Cooking"]);

    let outcome = app.query("author:klabnik").expect("query");
    assert_eq!(names(&outcome), vec!["Rust Book"]);
}

#[test]
fn both_backends_answer_free_text_queries() {
    for backend in [SearchBackend::Sqlite, SearchBackend::DocumentIndex] {
        let (_temp, app) = catalog(backend);
        let outcome = app.query("official").expect("query");
        assert!(matches!(outcome, QueryOutcome::Searched { .. }));
        assert_eq!(names(&outcome), vec!["Rust Book"], "backend {backend:?}");
    }
}

#[test]
fn archiving_a_subtree_hides_it_from_default_filters() {
    let (_temp, app) = catalog(SearchBackend::DocumentIndex);
    let scope = app.new_filter("project:work").expect("filter");
    let archive = Modifier::new("archived", "true").expect("modifier");
    assert_eq!(app.bulk_modify(&scope, &archive).expect("modify"), 3);

    let outcome = app.query("project:work").expect("query");
    assert!(outcome.bookmarks().is_empty());
    let outcome = app.query("project:work archived:true").expect("query");
    assert_eq!(names(&outcome), vec!["async book", "Old notes", "Rust Book"]);

    let stats = app.get_statistics().expect("stats");
    assert_eq!(stats.archived, 3);
    assert_eq!(stats.indexed_documents, Some(4));
}
