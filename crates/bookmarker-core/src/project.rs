use std::fmt::Write as _;

use serde::Serialize;
use tracing::warn;

/// Separator between the segments of a project path.
pub const PROJECT_SEPARATOR: char = '.';

const PRINT_INDENT: &str = "   ";
// Printed in place of the empty name of the no-project root.
const UNNAMED_LABEL: &str = "-";

/// Index of a node inside a [`ProjectForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

#[derive(Debug, Clone)]
struct ProjectNode {
    name: String,
    parent: Option<ProjectId>,
    children: Vec<ProjectId>,
    own_count: u64,
}

/// Hierarchical view over dot-delimited project paths.
///
/// Nodes live in one arena and refer to each other by [`ProjectId`]; roots
/// have no parent. The forest is rebuilt from scratch for every query.
#[derive(Debug, Clone, Default)]
pub struct ProjectForest {
    nodes: Vec<ProjectNode>,
    roots: Vec<ProjectId>,
    failures: Vec<String>,
}

/// Owned, serializable snapshot of one subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTree {
    pub name: String,
    pub full_name: String,
    pub own_count: u64,
    pub total_count: u64,
    pub children: Vec<ProjectTree>,
}

/// Builds a sorted forest from project paths and their bookmark counts.
///
/// When the two slices differ in length every count is treated as zero.
/// Paths that cannot be inserted are recorded in [`ProjectForest::failures`]
/// and do not stop the batch.
pub fn parse_trees<S: AsRef<str>>(paths: &[S], counts: &[u64]) -> ProjectForest {
    let counts_match = paths.len() == counts.len();
    if !counts_match {
        warn!(
            paths = paths.len(),
            counts = counts.len(),
            "project path and count lengths differ; using zero counts"
        );
    }

    let mut forest = ProjectForest::default();
    for (idx, path) in paths.iter().enumerate() {
        let count = if counts_match { counts[idx] } else { 0 };
        let path = path.as_ref();
        if forest.insert(path, count).is_none() {
            warn!(path, "skipping malformed project path");
            forest.failures.push(path.to_string());
        }
    }
    forest.sort_children();
    forest
}

impl ProjectForest {
    /// Inserts `path`, creating missing ancestors, and adds `count` to the
    /// terminal node's own count. The empty path is the root of bookmarks
    /// without a project. Returns the terminal node, or `None` when a
    /// non-empty path has an empty segment.
    pub fn insert(&mut self, path: &str, count: u64) -> Option<ProjectId> {
        if !path.is_empty() && path.split(PROJECT_SEPARATOR).any(str::is_empty) {
            return None;
        }
        let mut parent = None;
        for segment in path.split(PROJECT_SEPARATOR) {
            let id = match self.child_named(parent, segment) {
                Some(id) => id,
                None => self.push_node(segment, parent),
            };
            parent = Some(id);
        }
        let id = parent?;
        self.nodes[id.0].own_count += count;
        Some(id)
    }

    fn push_node(&mut self, name: &str, parent: Option<ProjectId>) -> ProjectId {
        let id = ProjectId(self.nodes.len());
        self.nodes.push(ProjectNode {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            own_count: 0,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn child_named(&self, parent: Option<ProjectId>, name: &str) -> Option<ProjectId> {
        let siblings = match parent {
            Some(parent) => &self.nodes[parent.0].children,
            None => &self.roots,
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].name == name)
    }

    /// Stable name sort of roots and every child list.
    pub fn sort_children(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_ids(&mut roots);
        self.roots = roots;
        for idx in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[idx].children);
            self.sort_ids(&mut children);
            self.nodes[idx].children = children;
        }
    }

    fn sort_ids(&self, ids: &mut [ProjectId]) {
        ids.sort_by(|a, b| self.nodes[a.0].name.cmp(&self.nodes[b.0].name));
    }

    #[must_use]
    pub fn roots(&self) -> &[ProjectId] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, id: ProjectId) -> &[ProjectId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn parent(&self, id: ProjectId) -> Option<ProjectId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn name(&self, id: ProjectId) -> &str {
        &self.nodes[id.0].name
    }

    #[must_use]
    pub fn own_count(&self, id: ProjectId) -> u64 {
        self.nodes[id.0].own_count
    }

    /// Own count plus the own counts of every descendant.
    #[must_use]
    pub fn total_count(&self, id: ProjectId) -> u64 {
        self.nodes[id.0]
            .children
            .iter()
            .fold(self.own_count(id), |total, child| {
                total + self.total_count(*child)
            })
    }

    /// Dot-joined path from the root down to `id`.
    #[must_use]
    pub fn full_name(&self, id: ProjectId) -> String {
        let mut segments = vec![self.name(id)];
        let mut current = self.parent(id);
        while let Some(parent) = current {
            segments.push(self.name(parent));
            current = self.parent(parent);
        }
        segments.reverse();
        segments.join(&PROJECT_SEPARATOR.to_string())
    }

    #[must_use]
    pub fn find(&self, path: &str) -> Option<ProjectId> {
        let mut current = None;
        for segment in path.split(PROJECT_SEPARATOR) {
            current = Some(self.child_named(current, segment)?);
        }
        current
    }

    /// Bookmarks counted anywhere in the forest.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.roots.iter().map(|root| self.total_count(*root)).sum()
    }

    /// Paths rejected while building.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renders every root and its descendants, one node per line, indented
    /// three spaces per level, with total counts. The no-project root prints
    /// as `-`.
    #[must_use]
    pub fn print_tree(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            self.print_node(*root, 0, &mut out);
        }
        out
    }

    fn print_node(&self, id: ProjectId, depth: usize, out: &mut String) {
        let _ = writeln!(
            out,
            "{}{} ({})",
            PRINT_INDENT.repeat(depth),
            match self.name(id) {
                "" => UNNAMED_LABEL,
                name => name,
            },
            self.total_count(id)
        );
        for child in self.children(id) {
            self.print_node(*child, depth + 1, out);
        }
    }

    #[must_use]
    pub fn tree(&self, id: ProjectId) -> ProjectTree {
        ProjectTree {
            name: self.name(id).to_string(),
            full_name: self.full_name(id),
            own_count: self.own_count(id),
            total_count: self.total_count(id),
            children: self
                .children(id)
                .iter()
                .map(|child| self.tree(*child))
                .collect(),
        }
    }

    #[must_use]
    pub fn to_trees(&self) -> Vec<ProjectTree> {
        self.roots.iter().map(|root| self.tree(*root)).collect()
    }
}
