//! Output model
//!
//! Every view maps its data into one of these serializable records before
//! rendering. Paths are emitted relative to the scan root with '/'
//! separators; the absolute root is carried once, in [`ScanSummary`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::core::aggregate::ExtensionStats;
use crate::core::file_reader::TextEncoding;
use crate::core::paths::{make_relative, normalize_path};
use crate::core::tree::{FileStatus, Node, NodeId, ScanTree};

/// Label used for files without an extension
pub const NO_EXTENSION_LABEL: &str = "(none)";

/// Human label for an extension key
pub fn extension_label(ext: &str) -> &str {
    if ext.is_empty() {
        NO_EXTENSION_LABEL
    } else {
        ext
    }
}

fn relative_path(path: &Path, root: &Path) -> String {
    make_relative(path, root).unwrap_or_else(|| normalize_path(path))
}

/// One node of the display tree, children already in display order
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size_bytes: u64,
    pub is_text: bool,
    /// Recursive total for directories, own count for text files
    pub tokens: usize,
    #[serde(flatten)]
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeView>,
}

impl NodeView {
    /// Build the view of `id` and everything below it
    pub fn from_tree(tree: &ScanTree, id: NodeId) -> Self {
        let root = &tree.root_node().full_path;
        let node = tree.get(id);
        let children = tree
            .sorted_children(id)
            .into_iter()
            .map(|child| NodeView::from_tree(tree, child))
            .collect();

        Self {
            name: node.name.clone(),
            path: relative_path(&node.full_path, root),
            is_dir: node.is_dir,
            size_bytes: node.size_bytes,
            is_text: node.is_text,
            tokens: node.total_recursive_tokens,
            status: node.status.clone(),
            children,
        }
    }

    /// Pre-order walk yielding `(depth, node)`
    pub fn flatten(&self) -> Vec<(usize, &NodeView)> {
        let mut out = Vec::new();
        let mut stack = vec![(0usize, self)];
        while let Some((depth, view)) = stack.pop() {
            out.push((depth, view));
            stack.extend(view.children.iter().rev().map(|c| (depth + 1, c)));
        }
        out
    }

    /// The node's own fields without its children
    pub fn record(&self, depth: usize) -> NodeRecord<'_> {
        NodeRecord {
            depth,
            name: &self.name,
            path: &self.path,
            is_dir: self.is_dir,
            size_bytes: self.size_bytes,
            is_text: self.is_text,
            tokens: self.tokens,
            status: &self.status,
        }
    }
}

/// Flat form of a [`NodeView`], one per JSONL line
#[derive(Debug, Serialize)]
pub struct NodeRecord<'a> {
    pub depth: usize,
    pub name: &'a str,
    pub path: &'a str,
    pub is_dir: bool,
    pub size_bytes: u64,
    pub is_text: bool,
    pub tokens: usize,
    #[serde(flatten)]
    pub status: &'a FileStatus,
}

/// One row of the flat file list
#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    pub name: String,
    pub extension: String,
    pub path: String,
    pub full_path: String,
    pub is_text: bool,
    pub tokens: usize,
    pub size_bytes: u64,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileRow {
    pub fn from_node(node: &Node, root: &Path) -> Self {
        Self {
            name: node.name.clone(),
            extension: node.extension.clone(),
            path: relative_path(&node.full_path, root),
            full_path: normalize_path(&node.full_path),
            is_text: node.is_text,
            tokens: if node.is_text { node.token_count } else { 0 },
            size_bytes: node.size_bytes,
            status: node.status.clone(),
        }
    }
}

/// One row of the per-extension table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionRow {
    pub extension: String,
    pub count: usize,
    pub tokens: usize,
    pub bytes: u64,
}

impl ExtensionRow {
    pub fn new(extension: &str, stats: ExtensionStats) -> Self {
        Self {
            extension: extension.to_string(),
            count: stats.count,
            tokens: stats.tokens,
            bytes: stats.bytes,
        }
    }

    pub fn label(&self) -> &str {
        extension_label(&self.extension)
    }
}

/// Totals printed after the tree
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root_path: String,
    pub scanned_at: DateTime<Utc>,
    pub encoder: String,
    pub text_file_count: usize,
    pub total_file_count: usize,
    pub processed_file_count: usize,
    pub total_tokens: usize,
    pub total_text_bytes: u64,
    pub unique_extension_count: usize,
    /// Sorted; the empty string stands for "no extension"
    pub extensions: Vec<String>,
    pub cancelled: bool,
}

/// The full `scan` view
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    /// `None` when there was nothing to scan
    pub tree: Option<NodeView>,
}

/// Decoded content of a single file
#[derive(Debug, Clone, Serialize)]
pub struct PreviewView {
    pub path: String,
    pub size_bytes: u64,
    #[serde(flatten)]
    pub status: FileStatus,
    pub encoder: String,
    pub tokens: usize,
    /// Characters in the full decoded text
    pub char_count: usize,
    pub truncated: bool,
    /// Characters shown when truncated
    pub shown_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pieces: Option<Vec<String>>,
}

impl PreviewView {
    pub fn encoding(&self) -> Option<TextEncoding> {
        match self.status {
            FileStatus::Text { encoding } => Some(encoding),
            _ => None,
        }
    }
}

/// Availability of one tokenizer backend
#[derive(Debug, Clone, Serialize)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    /// Whether this is the model the current run would use
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> FileStatus {
        FileStatus::Text {
            encoding: TextEncoding::Utf8,
        }
    }

    fn sample_tree() -> ScanTree {
        let mut tree = ScanTree::new(Path::new("/p"));
        for (path, tokens) in [("/p/b.md", 3), ("/p/src/file10.rs", 5), ("/p/src/file2.rs", 7)] {
            let mut node = Node::file(Path::new(path), 10, text());
            node.token_count = tokens;
            tree.insert_file(node).unwrap();
        }
        tree.insert_file(Node::file(Path::new("/p/a.png"), 50, FileStatus::Binary))
            .unwrap();
        crate::core::aggregate::aggregate(&mut tree);
        tree
    }

    #[test]
    fn test_node_view_display_order() {
        let tree = sample_tree();
        let view = NodeView::from_tree(&tree, tree.root());
        let names: Vec<_> = view
            .flatten()
            .into_iter()
            .map(|(depth, v)| format!("{}:{}", depth, v.name))
            .collect();
        assert_eq!(
            names,
            vec!["0:p", "1:src", "2:file2.rs", "2:file10.rs", "1:a.png", "1:b.md"]
        );
        assert_eq!(view.tokens, 15);
        assert_eq!(view.path, "");
    }

    #[test]
    fn test_node_view_json_shape() {
        let tree = sample_tree();
        let view = NodeView::from_tree(&tree, tree.root());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["kind"], "directory");
        assert_eq!(json["children"][0]["path"], "src");
        let png = &json["children"][1];
        assert_eq!(png["kind"], "binary");
        assert!(png.get("children").is_none());
    }

    #[test]
    fn test_file_row_hides_tokens_of_non_text() {
        let mut node = Node::file(Path::new("/p/x.bin"), 9, FileStatus::Binary);
        node.token_count = 99;
        let row = FileRow::from_node(&node, Path::new("/p"));
        assert_eq!(row.tokens, 0);
        assert_eq!(row.path, "x.bin");
        assert_eq!(row.full_path, "/p/x.bin");
    }

    #[test]
    fn test_extension_label() {
        assert_eq!(extension_label(""), "(none)");
        assert_eq!(extension_label(".rs"), ".rs");
    }
}
