use std::io::{self, Write};

use anyhow::{Result, anyhow};
use bookmarker_core::{Bookmark, Bookmarker, Modifier};

use crate::cli::AddArgs;

pub(super) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub(super) fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))
}

pub(super) fn build_modifier(assignments: &[String]) -> Result<Modifier> {
    let mut modifier = Modifier::default();
    for raw in assignments {
        let (key, value) = split_assignment(raw)?;
        modifier.set(key, value)?;
    }
    Ok(modifier)
}

pub(super) fn build_bookmark(app: &Bookmarker, args: &AddArgs) -> Result<Bookmark> {
    let mut bookmark = app
        .blank_bookmark(&args.name, &args.link)
        .with_description(args.description.as_str())
        .with_project(args.project.as_str())
        .with_tags(args.tags.iter().map(String::as_str));
    for raw in &args.metadata {
        let (key, value) = split_assignment(raw)?;
        bookmark.set_metadata(key, value);
    }
    Ok(bookmark)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(split_assignment("project = a.b").expect("split"), ("project", "a.b"));
        assert_eq!(split_assignment("note=x=y").expect("split"), ("note", "x=y"));
        assert!(split_assignment("project").is_err());
        assert!(split_assignment("=value").is_err());
    }

    #[test]
    fn modifier_collects_every_assignment() {
        let modifier =
            build_modifier(&["project=old".to_string(), "archived=true".to_string()])
                .expect("modifier");
        assert_eq!(modifier.project.as_deref(), Some("old"));
        assert_eq!(modifier.archived, Some(true));
        assert!(build_modifier(&["colour=red".to_string()]).is_err());
    }
}
