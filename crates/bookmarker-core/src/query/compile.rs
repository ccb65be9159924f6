use chrono::{DateTime, Utc};
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

use crate::error::{BookmarkerError, Result};

use super::filter::{Filter, NamedField, Predicate};
use super::modifier::Modifier;

/// Ceiling on rows returned by a compiled filter.
pub const RESULT_LIMIT: usize = 300;

/// Column list shared by every query that produces bookmark rows. Tags come
/// back as one string joined with the unit separator (`\u{1f}`).
pub(crate) const BOOKMARK_ROW_COLUMNS: &str = r"
    b.id AS id,
    b.name AS name,
    b.description AS description,
    b.content AS content,
    b.project AS project,
    b.created_at AS created_at,
    b.updated_at AS updated_at,
    b.archived AS archived,
    (
        SELECT group_concat(t.name, char(31) ORDER BY bt.position)
        FROM bookmark_tags bt
        JOIN tags t ON t.id = bt.tag
        WHERE bt.bookmark = b.id
    ) AS tags";

const PROJECT_COUNTS_SQL: &str = r"
SELECT project, COUNT(*) AS count
FROM bookmarks
GROUP BY project
ORDER BY project ASC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(value) => value.to_sql(),
            Self::Integer(value) => value.to_sql(),
        }
    }
}

/// SQL text plus its parameters. Placeholders are numbered `?1..?n` in the
/// same order as `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Default)]
struct Binder {
    params: Vec<SqlParam>,
}

impl Binder {
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    fn finish(self, sql: String) -> CompiledQuery {
        CompiledQuery {
            sql,
            params: self.params,
        }
    }
}

/// Compiles a structured filter into a bookmark row query.
///
/// Metadata predicates and named-field predicates land in separate branches
/// joined with `UNION`. The archived predicate is rendered as a literal in
/// every branch and never bound.
pub fn compile(filter: &Filter) -> Result<CompiledQuery> {
    let mut binder = Binder::default();
    let branches = compile_branches(filter, &mut binder)?;
    let sql = format!(
        "SELECT * FROM (\n{}\n) AS a\nORDER BY lower(a.name) ASC, a.id ASC\nLIMIT {RESULT_LIMIT}",
        branches.join("\nUNION\n")
    );
    Ok(binder.finish(sql))
}

/// Compiles the `(project, count)` aggregate that feeds the project forest,
/// restricted to the bookmarks `filter` selects.
pub fn compile_projects(filter: &Filter) -> Result<CompiledQuery> {
    if filter.is_empty() && filter.archived.is_none() && !filter.is_plain_query() {
        return Ok(Binder::default().finish(PROJECT_COUNTS_SQL.trim_start().to_string()));
    }
    let mut binder = Binder::default();
    let branches = compile_branches(filter, &mut binder)?;
    let sql = format!(
        "SELECT p.project AS project, COUNT(*) AS count\nFROM bookmarks p\nWHERE p.id IN (\nSELECT a.id FROM (\n{}\n) AS a\n)\nGROUP BY p.project\nORDER BY p.project ASC",
        branches.join("\nUNION\n")
    );
    Ok(binder.finish(sql))
}

/// Compiles an `UPDATE` that applies `modifier` to the bookmarks selected by
/// the named predicates of `filter`.
pub fn compile_bulk_update(
    filter: &Filter,
    modifier: &Modifier,
    now: DateTime<Utc>,
) -> Result<CompiledQuery> {
    if filter.is_plain_query() {
        return Err(BookmarkerError::Compile(
            "bulk update needs a structured filter, not free text".to_string(),
        ));
    }
    if filter.custom.values().any(Predicate::is_set) {
        return Err(BookmarkerError::Compile(
            "bulk update does not support custom metadata predicates".to_string(),
        ));
    }
    if modifier.is_empty() {
        return Err(BookmarkerError::Compile(
            "modifier has no field to set".to_string(),
        ));
    }

    let mut binder = Binder::default();
    let mut assignments = Vec::new();
    if let Some(project) = modifier.project.as_deref().filter(|p| !p.is_empty()) {
        let placeholder = binder.bind(SqlParam::Text(project.to_string()));
        assignments.push(format!("project = {placeholder}"));
    }
    if let Some(archived) = modifier.archived {
        let placeholder = binder.bind(SqlParam::Integer(i64::from(archived)));
        assignments.push(format!("archived = {placeholder}"));
    }
    let placeholder = binder.bind(SqlParam::Text(now.to_rfc3339()));
    assignments.push(format!("updated_at = {placeholder}"));

    let mut conditions = named_conditions(filter, &mut binder);
    conditions.extend(filter.archived.map(archived_condition));
    if conditions.is_empty() {
        return Err(BookmarkerError::Compile(
            "bulk update needs at least one scoping predicate".to_string(),
        ));
    }

    let sql = format!(
        "UPDATE bookmarks AS b\nSET {}\nWHERE {}",
        assignments.join(", "),
        conditions.join("\n  AND ")
    );
    Ok(binder.finish(sql))
}

fn compile_branches(filter: &Filter, binder: &mut Binder) -> Result<Vec<String>> {
    if filter.is_plain_query() {
        return Err(BookmarkerError::Compile(
            "free-text queries are served by full-text search".to_string(),
        ));
    }
    let archived = filter.archived.map(archived_condition);
    let mut branches = Vec::with_capacity(2);

    let custom = filter
        .custom
        .iter()
        .filter(|(_, predicate)| predicate.is_set())
        .collect::<Vec<_>>();
    if !custom.is_empty() {
        let mut conditions = custom
            .into_iter()
            .map(|(key, predicate)| custom_condition(key, predicate, binder))
            .collect::<Vec<_>>();
        conditions.extend(archived.clone());
        branches.push(select_branch(&conditions));
    }

    if filter.has_named_predicates() || branches.is_empty() {
        let mut conditions = named_conditions(filter, binder);
        conditions.extend(archived);
        branches.push(select_branch(&conditions));
    }
    Ok(branches)
}

fn select_branch(conditions: &[String]) -> String {
    let mut sql = format!("SELECT{BOOKMARK_ROW_COLUMNS}\nFROM bookmarks b");
    if !conditions.is_empty() {
        sql.push_str("\nWHERE ");
        sql.push_str(&conditions.join("\n  AND "));
    }
    sql
}

fn named_conditions(filter: &Filter, binder: &mut Binder) -> Vec<String> {
    filter
        .named_predicates()
        .into_iter()
        .filter(|(_, predicate)| predicate.is_set())
        .map(|(field, predicate)| named_condition(field, predicate, binder))
        .collect()
}

fn named_condition(field: NamedField, predicate: &Predicate, binder: &mut Binder) -> String {
    let op = comparison(predicate);
    let value = predicate.value.to_lowercase();
    let placeholder = binder.bind(SqlParam::Text(if predicate.strict {
        value
    } else {
        format!("%{value}%")
    }));
    match field {
        NamedField::Name => format!("(b.lower_name {op} {placeholder})"),
        NamedField::Description => format!("(b.description_lower {op} {placeholder})"),
        NamedField::Content => format!("(lower(b.content) {op} {placeholder})"),
        NamedField::Project => format!("(lower(b.project) {op} {placeholder})"),
        NamedField::Tags => format!(
            "EXISTS (SELECT 1 FROM bookmark_tags bt JOIN tags t ON t.id = bt.tag \
             WHERE bt.bookmark = b.id AND lower(t.name) {op} {placeholder})"
        ),
    }
}

/// Matches one metadata row by case-folded key and value. Both travel in a
/// single JSON pair parameter and are compared as separate columns, so a key
/// containing `:` cannot pair with another key's value.
fn custom_condition(key: &str, predicate: &Predicate, binder: &mut Binder) -> String {
    let value = predicate.value.to_lowercase();
    let (pattern, comparison) = if predicate.strict {
        (value, "=")
    } else {
        (format!("%{}%", value.replace('\\', "\\\\")), "LIKE")
    };
    let pair = serde_json::json!([key.to_lowercase(), pattern]).to_string();
    let placeholder = binder.bind(SqlParam::Text(pair));
    let escape = if predicate.strict { "" } else { " ESCAPE '\\'" };
    format!(
        "EXISTS (SELECT 1 FROM metadata m WHERE m.bookmark = b.id \
         AND m.key_lower = json_extract({placeholder}, '$[0]') \
         AND m.value_lower {comparison} json_extract({placeholder}, '$[1]'){escape})"
    )
}

fn archived_condition(archived: bool) -> String {
    format!("(b.archived = {})", i64::from(archived))
}

const fn comparison(predicate: &Predicate) -> &'static str {
    if predicate.strict { "=" } else { "LIKE" }
}

pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
