use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

fn run(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bookmarker"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("BOOKMARKER_LOG", "off")
        .output()
        .expect("run bookmarker")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

#[test]
fn add_then_filter_and_query_round_trip() {
    let root = tempdir().expect("tempdir");
    let added = stdout_json(&run(
        root.path(),
        &[
            "add",
            "--name",
            "Rust Book",
            "--link",
            "https://doc.rust-lang.org/book",
            "--project",
            "work.research",
            "--tag",
            "rust",
            "--meta",
            "Author=Steve Klabnik",
        ],
    ));
    assert_eq!(added["name"], "Rust Book");
    assert!(added["id"].as_i64().expect("id") > 0);

    let filtered = stdout_json(&run(root.path(), &["filter", "author:klabnik"]));
    assert_eq!(filtered["bookmarks"][0]["name"], "Rust Book");
    assert_eq!(filtered["skipped_rows"], 0);

    let searched = stdout_json(&run(root.path(), &["query", "rust"]));
    assert_eq!(searched["kind"], "searched");

    let printed = run(root.path(), &["projects", "--print"]);
    assert!(printed.status.success());
    assert_eq!(
        String::from_utf8_lossy(&printed.stdout),
        "work (1)\n   research (1)\n"
    );
}

#[test]
fn parse_errors_exit_non_zero_with_json_payload() {
    let root = tempdir().expect("tempdir");
    let output = run(root.path(), &["filter", "a:b:c"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let payload: Value = serde_json::from_slice(&output.stderr).expect("stderr json");
    assert_eq!(payload["code"], "PARSE_ERROR");
    assert_eq!(payload["operation"], "filter");
}

#[test]
fn modify_reports_changed_rows() {
    let root = tempdir().expect("tempdir");
    for name in ["one", "two"] {
        stdout_json(&run(
            root.path(),
            &["add", "--name", name, "--link", "https://a.example", "--project", "inbox"],
        ));
    }
    let result = stdout_json(&run(
        root.path(),
        &["modify", "project:inbox", "--set", "project=done"],
    ));
    assert_eq!(result["changed"], 2);

    let stats = stdout_json(&run(root.path(), &["stats"]));
    assert_eq!(stats["bookmarks"], 2);
    assert_eq!(stats["projects"], 1);
}
