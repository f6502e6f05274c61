//! Token aggregation
//!
//! Fills per-file token counts from decoded content, then sums them bottom
//! up so every directory carries the total of its subtree. Everything is
//! recomputed from scratch on each call.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

use crate::core::tokenizer::Tokenizer;
use crate::core::tree::{NodeId, ScanTree};

/// Per-extension totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    /// Files with this extension, text or not
    pub count: usize,
    /// Tokens across the text files only
    pub tokens: usize,
    /// Bytes on disk across all files
    pub bytes: u64,
}

/// Set `token_count` on every text file from its decoded content
///
/// Returns the sum over all text files. Text nodes without an entry in
/// `contents` count as 0 tokens.
pub fn count_tokens(
    tree: &mut ScanTree,
    contents: &HashMap<PathBuf, String>,
    tokenizer: &Tokenizer,
) -> usize {
    let jobs: Vec<(NodeId, &str)> = tree
        .files()
        .filter(|(_, node)| node.is_text)
        .map(|(id, node)| {
            let text = contents
                .get(&node.full_path)
                .map(String::as_str)
                .unwrap_or_default();
            (id, text)
        })
        .collect();

    #[cfg(feature = "parallel")]
    let counted: Vec<(NodeId, usize)> = {
        use rayon::prelude::*;
        jobs.par_iter()
            .map(|(id, text)| (*id, tokenizer.count(text)))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let counted: Vec<(NodeId, usize)> = jobs
        .iter()
        .map(|(id, text)| (*id, tokenizer.count(text)))
        .collect();

    let mut total = 0;
    for (id, tokens) in counted {
        tree.get_mut(id).token_count = tokens;
        total += tokens;
    }
    debug!("counted tokens for {} text files", jobs.len());
    total
}

/// Recompute `total_recursive_tokens` for the whole tree; returns the root total
pub fn aggregate(tree: &mut ScanTree) -> usize {
    let root = tree.root();
    aggregate_from(tree, root)
}

/// Recompute `total_recursive_tokens` for the subtree under `start`
///
/// Iterative post-order walk: a file contributes its `token_count` when it
/// is text and 0 otherwise; a directory is the sum of its children.
pub fn aggregate_from(tree: &mut ScanTree, start: NodeId) -> usize {
    let mut stack: Vec<(NodeId, bool)> = vec![(start, false)];

    while let Some((id, children_done)) = stack.pop() {
        let node = tree.get(id);
        if !node.is_dir {
            let own = if node.is_text { node.token_count } else { 0 };
            tree.get_mut(id).total_recursive_tokens = own;
            continue;
        }

        if children_done {
            let sum: usize = node
                .children()
                .iter()
                .map(|child| tree.get(*child).total_recursive_tokens)
                .sum();
            tree.get_mut(id).total_recursive_tokens = sum;
        } else {
            stack.push((id, true));
            stack.extend(node.children().iter().map(|child| (*child, false)));
        }
    }

    tree.get(start).total_recursive_tokens
}

/// Group every file node by extension (`""` for none)
pub fn extension_summary(tree: &ScanTree) -> BTreeMap<String, ExtensionStats> {
    tree.files()
        .fold(BTreeMap::new(), |mut summary, (_, node)| {
            let entry: &mut ExtensionStats = summary.entry(node.extension.clone()).or_default();
            entry.count += 1;
            entry.bytes += node.size_bytes;
            if node.is_text {
                entry.tokens += node.token_count;
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::file_reader::TextEncoding;
    use crate::core::tree::{FileStatus, Node};
    use std::path::Path;

    fn text_node(path: &str, tokens: usize) -> Node {
        let mut node = Node::file(
            Path::new(path),
            tokens as u64 * 4,
            FileStatus::Text {
                encoding: TextEncoding::Utf8,
            },
        );
        node.token_count = tokens;
        node
    }

    fn sample_tree() -> ScanTree {
        let mut tree = ScanTree::new(Path::new("/p"));
        tree.insert_file(text_node("/p/a.md", 10)).unwrap();
        tree.insert_file(text_node("/p/docs/b.md", 20)).unwrap();
        tree.insert_file(text_node("/p/docs/deep/c.md", 0)).unwrap();
        let mut binary = Node::file(Path::new("/p/docs/d.md"), 99, FileStatus::Binary);
        // a stale count on a non-text node must never be summed
        binary.token_count = 1000;
        tree.insert_file(binary).unwrap();
        tree
    }

    #[test]
    fn test_aggregate_sums_text_files() {
        let mut tree = sample_tree();
        assert_eq!(aggregate(&mut tree), 30);

        let docs = tree.lookup(Path::new("/p/docs")).unwrap();
        assert_eq!(tree.get(docs).total_recursive_tokens, 20);
        let deep = tree.lookup(Path::new("/p/docs/deep")).unwrap();
        assert_eq!(tree.get(deep).total_recursive_tokens, 0);
        let bin = tree.lookup(Path::new("/p/docs/d.md")).unwrap();
        assert_eq!(tree.get(bin).total_recursive_tokens, 0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let mut tree = sample_tree();
        let first = aggregate(&mut tree);
        let snapshot: Vec<_> = tree.iter().map(|(_, n)| n.total_recursive_tokens).collect();
        let second = aggregate(&mut tree);
        let again: Vec<_> = tree.iter().map(|(_, n)| n.total_recursive_tokens).collect();
        assert_eq!(first, second);
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_aggregate_tracks_mutation() {
        let mut tree = sample_tree();
        aggregate(&mut tree);
        let a = tree.lookup(Path::new("/p/a.md")).unwrap();
        tree.get_mut(a).token_count = 15;
        assert_eq!(aggregate(&mut tree), 35);
    }

    #[test]
    fn test_aggregate_subtree() {
        let mut tree = sample_tree();
        let docs = tree.lookup(Path::new("/p/docs")).unwrap();
        assert_eq!(aggregate_from(&mut tree, docs), 20);
    }

    #[test]
    fn test_root_total_matches_text_file_sum() {
        let mut tree = sample_tree();
        let expected: usize = tree
            .files()
            .filter(|(_, n)| n.is_text)
            .map(|(_, n)| n.token_count)
            .sum();
        assert_eq!(aggregate(&mut tree), expected);
    }

    #[test]
    fn test_extension_summary_counts_binary_files() {
        let tree = sample_tree();
        let summary = extension_summary(&tree);
        assert_eq!(summary.len(), 1);
        let md = summary[".md"];
        assert_eq!(md.count, 4);
        assert_eq!(md.tokens, 30);
    }

    #[test]
    fn test_extension_summary_no_extension_sentinel() {
        let mut tree = ScanTree::new(Path::new("/p"));
        tree.insert_file(text_node("/p/Makefile", 7)).unwrap();
        tree.insert_file(text_node("/p/main.rs", 3)).unwrap();
        let summary = extension_summary(&tree);
        assert_eq!(summary[""].tokens, 7);
        assert_eq!(summary[".rs"].count, 1);
    }

    #[test]
    fn test_count_tokens_from_contents() {
        let mut tree = ScanTree::new(Path::new("/p"));
        let a = tree.insert_file(text_node("/p/a.py", 0)).unwrap();
        let b = tree
            .insert_file(Node::file(Path::new("/p/b.png"), 50, FileStatus::Binary))
            .unwrap();
        let empty = tree.insert_file(text_node("/p/empty.txt", 0)).unwrap();

        let mut contents = HashMap::new();
        contents.insert(PathBuf::from("/p/a.py"), "print(1)".to_string());
        contents.insert(PathBuf::from("/p/empty.txt"), String::new());

        let tokenizer = Tokenizer::heuristic();
        let total = count_tokens(&mut tree, &contents, &tokenizer);
        assert_eq!(total, tokenizer.count("print(1)"));
        assert_eq!(tree.get(a).token_count, 2);
        assert_eq!(tree.get(b).token_count, 0);
        assert_eq!(tree.get(empty).token_count, 0);

        assert_eq!(aggregate(&mut tree), 2);
    }
}
