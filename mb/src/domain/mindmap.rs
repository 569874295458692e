//! Mindmap projection and branch outline
//!
//! Both are derived on demand from the final statement, the thread registry
//! and the branch tree. Nothing here is stored.

use serde::Serialize;
use tracing::debug;

use super::{Branch, BranchId, BranchTree, ThreadKind, ThreadRegistry};

/// Id of the mindmap root node
pub const ROOT_ID: &str = "root";

/// A node of the exported mindmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MindmapNode {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub children: Vec<MindmapNode>,
}

impl MindmapNode {
    /// Find a node anywhere below (or at) this one
    pub fn find(&self, id: &str) -> Option<&MindmapNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Project root -> threads -> branches -> sub-branches
pub fn project(final_statement: &str, threads: &ThreadRegistry, tree: &BranchTree) -> MindmapNode {
    debug!(branch_count = tree.len(), "project: called");
    MindmapNode {
        id: ROOT_ID.to_string(),
        name: final_statement.to_string(),
        description: None,
        content: None,
        children: threads
            .iter()
            .map(|t| MindmapNode {
                id: t.kind.id().to_string(),
                name: t.kind.name().to_string(),
                description: Some(t.kind.description().to_string()),
                content: None,
                children: tree.top_level(t.kind).map(|b| branch_node(b, tree)).collect(),
            })
            .collect(),
    }
}

fn branch_node(branch: &Branch, tree: &BranchTree) -> MindmapNode {
    MindmapNode {
        id: branch.id.to_string(),
        name: branch.heading.clone(),
        description: None,
        content: Some(branch.content.clone()),
        children: tree.children(branch.id).map(|c| branch_node(c, tree)).collect(),
    }
}

/// Text outline of all branches grouped by thread
///
/// Expanded branches carry `[expanded]`, the active one a `*`. Children are
/// indented four spaces per level with their content beneath.
pub fn outline(tree: &BranchTree, active: Option<BranchId>) -> String {
    debug!(?active, "outline: called");
    if tree.is_empty() {
        return "No branches available yet. Please explore a thread first.".to_string();
    }

    let mut out = String::new();
    for kind in ThreadKind::ALL {
        let mut top = tree.top_level(kind).peekable();
        if top.peek().is_none() {
            continue;
        }
        out.push_str(&format!("{}:\n", kind.name()));
        for branch in top {
            write_branch(&mut out, tree, branch, active, 2);
        }
    }
    out.trim_end().to_string()
}

fn write_branch(out: &mut String, tree: &BranchTree, branch: &Branch, active: Option<BranchId>, indent: usize) {
    let pad = " ".repeat(indent);
    let current = if Some(branch.id) == active { " *" } else { "" };
    let expanded = if branch.expanded { " [expanded]" } else { "" };
    out.push_str(&format!("{pad}{}{current}: {}{expanded}\n", branch.id, branch.heading));
    for line in branch.content.lines() {
        out.push_str(&format!("{pad}    {line}\n"));
    }
    out.push('\n');
    for child in tree.children(branch.id) {
        write_branch(out, tree, child, active, indent + 4);
    }
}
