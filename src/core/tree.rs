//! Scan tree - arena of directory and file nodes
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A parent
//! owns its children through its `children` list; the `parent` field is
//! only a back-reference. Nodes are appended, never removed, so a child
//! always has a larger id than its parent.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::classify::extension_of;
use crate::core::file_reader::TextEncoding;
use crate::core::paths::display_name;
use crate::core::util::natural_cmp;

/// Index into the tree's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Why a node is or is not text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileStatus {
    Directory,
    /// Decoded successfully
    Text { encoding: TextEncoding },
    /// Deny-listed, NUL-heavy, or undecodable
    Binary,
    /// Over the size threshold, never read
    TooLarge,
    /// Open, stat or read failed
    Unreadable { reason: String },
    /// Outside the extension filter, never read
    Filtered,
}

/// One file or directory entry
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub full_path: PathBuf,
    pub is_dir: bool,
    /// File size on disk; always 0 for directories
    pub size_bytes: u64,
    pub is_text: bool,
    /// Meaningful only when `is_text`
    pub token_count: usize,
    /// Valid after aggregation
    pub total_recursive_tokens: usize,
    /// Lower-cased with leading dot, `""` when there is none
    pub extension: String,
    pub status: FileStatus,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    /// A directory node for `path`
    pub fn directory(path: &Path) -> Self {
        Self {
            name: display_name(path),
            full_path: path.to_path_buf(),
            is_dir: true,
            size_bytes: 0,
            is_text: false,
            token_count: 0,
            total_recursive_tokens: 0,
            extension: String::new(),
            status: FileStatus::Directory,
            children: Vec::new(),
            parent: None,
        }
    }

    /// A file node for `path`; `is_text` follows from `status`
    pub fn file(path: &Path, size_bytes: u64, status: FileStatus) -> Self {
        Self {
            name: display_name(path),
            full_path: path.to_path_buf(),
            is_dir: false,
            size_bytes,
            is_text: matches!(status, FileStatus::Text { .. }),
            token_count: 0,
            total_recursive_tokens: 0,
            extension: extension_of(path),
            status,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Tree shape violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("path already in tree: {0}")]
    DuplicatePath(PathBuf),
    #[error("path is outside the scan root: {0}")]
    OutsideRoot(PathBuf),
    #[error("parent is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// The scanned tree plus a path index for O(1) lookups
#[derive(Debug, Clone)]
pub struct ScanTree {
    nodes: Vec<Node>,
    root: NodeId,
    index: HashMap<PathBuf, NodeId>,
}

impl ScanTree {
    /// Create a tree holding only a root directory node
    pub fn new(root_path: &Path) -> Self {
        let root = Node::directory(root_path);
        let mut index = HashMap::new();
        index.insert(root.full_path.clone(), NodeId(0));

        Self {
            nodes: vec![root],
            root: NodeId(0),
            index,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        self.get(self.root)
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Total number of nodes, root included.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (only root).
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Look a node up by its full path
    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// Append `node` to `parent`'s children and set its back-reference
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, TreeError> {
        if !self.get(parent).is_dir {
            return Err(TreeError::NotADirectory(self.get(parent).full_path.clone()));
        }
        if self.index.contains_key(&node.full_path) {
            return Err(TreeError::DuplicatePath(node.full_path));
        }

        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.index.insert(node.full_path.clone(), id);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Directory node for `path`, creating it and any missing ancestors
    /// below the root.
    pub fn ensure_dir(&mut self, path: &Path) -> Result<NodeId, TreeError> {
        if let Some(id) = self.lookup(path) {
            return if self.get(id).is_dir {
                Ok(id)
            } else {
                Err(TreeError::NotADirectory(path.to_path_buf()))
            };
        }

        let root_path = self.root_node().full_path.clone();
        let relative = path
            .strip_prefix(&root_path)
            .map_err(|_| TreeError::OutsideRoot(path.to_path_buf()))?;

        let mut current = root_path;
        let mut parent = self.root;
        for component in relative.components() {
            current.push(component);
            parent = match self.lookup(&current) {
                Some(id) if self.get(id).is_dir => id,
                Some(_) => return Err(TreeError::NotADirectory(current)),
                None => self.add_child(parent, Node::directory(&current))?,
            };
        }
        Ok(parent)
    }

    /// Attach a file node under its parent directory, creating directories
    /// on demand.
    pub fn insert_file(&mut self, node: Node) -> Result<NodeId, TreeError> {
        let parent_path = node
            .full_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| TreeError::OutsideRoot(node.full_path.clone()))?;
        let parent = self.ensure_dir(&parent_path)?;
        self.add_child(parent, node)
    }

    /// Iterate over all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Iterate over file nodes in creation (discovery) order.
    pub fn files(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.iter().filter(|(_, node)| !node.is_dir)
    }

    /// Children for display: directories first, then natural name order.
    pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.get(id).children.clone();
        children.sort_by(|a, b| compare_for_display(self.get(*a), self.get(*b)));
        children
    }
}

/// Directories before files, then natural name order
pub fn compare_for_display(a: &Node, b: &Node) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| natural_cmp(&a.name, &b.name))
}
