//! Directory scanning backend
//!
//! Walks one or more input paths with the `ignore` crate, classifies each
//! file and assembles the [`ScanTree`] under the unified root.
//!
//! A scan runs in two phases. Enumeration lists every file (symlinks and
//! conventionally irrelevant directories skipped) so the total is known up
//! front; materialization then classifies and reads the files one by one,
//! in enumeration order, reporting progress after each. Cancellation is
//! polled between files and leaves a consistent partial tree.

use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::classify::{extension_of, Classifier, Verdict};
use crate::core::file_reader::{read_text, EncodingStrategy, SkipReason};
use crate::core::paths::unify;
use crate::core::tree::{FileStatus, Node, ScanTree};

/// Directory names skipped by default
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    ".venv",
    "venv",
    "target",
    "dist",
    "build",
    "vendor",
    ".idea",
    ".vscode",
];

/// Errors reported to the caller of a scan
///
/// Per-file problems never show up here; they are recorded on the nodes.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid root {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: &'static str },
    #[error("a scan is already running")]
    AlreadyRunning,
    #[error("scan worker panicked")]
    WorkerPanicked,
}

/// Scan configuration
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub classifier: Classifier,
    pub encoding: EncodingStrategy,
    /// Directory names never descended into
    pub skip_dirs: BTreeSet<String>,
    /// Honor .gitignore / .ignore files
    pub respect_gitignore: bool,
    /// Include dotfiles and dot-directories
    pub include_hidden: bool,
    /// When set, only these extensions (".py", "" for none) are read
    pub extensions_filter: Option<BTreeSet<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            encoding: EncodingStrategy::default(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: false,
            include_hidden: true,
            extensions_filter: None,
        }
    }
}

/// Cooperative cancellation flag shared between a scan and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress after one file has been materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    pub done: usize,
    pub total: usize,
    pub current_path: PathBuf,
}

/// Everything a scan produced
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub tree: ScanTree,
    /// Decoded text, keyed by full path, text files only
    pub file_contents: HashMap<PathBuf, String>,
    /// Text files in discovery order
    pub text_file_paths: Vec<PathBuf>,
    /// Every extension seen, text or not
    pub all_extensions: BTreeSet<String>,
    /// Files found by enumeration
    pub total_file_count: usize,
    /// Files materialized into the tree
    pub processed_file_count: usize,
    /// Empty when there was nothing to scan
    pub root_path: PathBuf,
    pub cancelled: bool,
}

impl ScanResult {
    fn empty(root_path: PathBuf, cancelled: bool) -> Self {
        Self {
            tree: ScanTree::new(&root_path),
            file_contents: HashMap::new(),
            text_file_paths: Vec::new(),
            all_extensions: BTreeSet::new(),
            total_file_count: 0,
            processed_file_count: 0,
            root_path,
            cancelled,
        }
    }

    /// Node by full path
    #[cfg(test)]
    pub fn node(&self, path: &Path) -> Option<&Node> {
        self.tree.lookup(path).map(|id| self.tree.get(id))
    }

    pub fn text_file_count(&self) -> usize {
        self.text_file_paths.len()
    }

    /// Bytes on disk of all text files
    pub fn total_text_bytes(&self) -> u64 {
        self.tree
            .files()
            .filter(|(_, node)| node.is_text)
            .map(|(_, node)| node.size_bytes)
            .sum()
    }
}

/// Check that `root` exists and is a directory, returning it canonicalized
pub fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let canonical = root.canonicalize().map_err(|_| ScanError::InvalidRoot {
        path: root.to_path_buf(),
        reason: "does not exist",
    })?;
    if !canonical.is_dir() {
        return Err(ScanError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory",
        });
    }
    Ok(canonical)
}

/// Scan any mix of files and directories under their common ancestor
///
/// Missing inputs are dropped; if nothing is left the result is empty with
/// an empty `root_path`.
pub fn scan(
    paths: &[PathBuf],
    options: &ScanOptions,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(&ScanProgress),
) -> ScanResult {
    let root_path = unify(paths);
    if root_path.as_os_str().is_empty() {
        info!("nothing to scan");
        return ScanResult::empty(root_path, cancel.is_cancelled());
    }

    let inputs: Vec<PathBuf> = paths.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let files = enumerate_files(&inputs, options, cancel);
    let mut result = ScanResult::empty(root_path, false);
    result.total_file_count = files.len();

    if cancel.is_cancelled() {
        info!("scan cancelled during enumeration");
        result.cancelled = true;
        return result;
    }

    for input in inputs.iter().filter(|p| p.is_dir()) {
        if let Err(e) = result.tree.ensure_dir(input) {
            warn!("cannot place {}: {}", input.display(), e);
        }
    }

    info!(
        "scanning {} files under {}",
        files.len(),
        result.root_path.display()
    );

    for path in &files {
        if cancel.is_cancelled() {
            info!(
                "scan cancelled after {} of {} files",
                result.processed_file_count,
                files.len()
            );
            result.cancelled = true;
            break;
        }

        let (node, content) = materialize(path, options);
        result.all_extensions.insert(node.extension.clone());
        match result.tree.insert_file(node) {
            Ok(_) => {
                if let Some(text) = content {
                    result.file_contents.insert(path.clone(), text);
                    result.text_file_paths.push(path.clone());
                }
            }
            Err(e) => warn!("cannot place {}: {}", path.display(), e),
        }

        result.processed_file_count += 1;
        report_progress(
            on_progress,
            &ScanProgress {
                done: result.processed_file_count,
                total: files.len(),
                current_path: path.clone(),
            },
        );
    }

    result
}

/// Phase 1: list every file under the inputs, deduplicated, in walk order
fn enumerate_files(inputs: &[PathBuf], options: &ScanOptions, cancel: &CancelToken) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if cancel.is_cancelled() {
            break;
        }

        if input.is_file() {
            if seen.insert(input.clone()) {
                files.push(input.clone());
            }
            continue;
        }

        for entry in build_walker(input, options).build() {
            if cancel.is_cancelled() {
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("walk error: {}", e);
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_symlink() {
                debug!("skipping symlink {}", entry.path().display());
                continue;
            }
            if file_type.is_file() && seen.insert(entry.path().to_path_buf()) {
                files.push(entry.into_path());
            }
        }
    }

    files
}

fn build_walker(dir: &Path, options: &ScanOptions) -> WalkBuilder {
    let ignore = options.respect_gitignore;
    let mut builder = WalkBuilder::new(dir);
    builder
        .hidden(!options.include_hidden)
        .git_ignore(ignore)
        .git_global(ignore)
        .git_exclude(ignore)
        .ignore(ignore)
        .parents(ignore)
        .require_git(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let skip_dirs = options.skip_dirs.clone();
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !(is_dir
            && entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| skip_dirs.contains(name)))
    });
    builder
}

/// Classify one file, read it if text, and build its node
pub fn materialize(path: &Path, options: &ScanOptions) -> (Node, Option<String>) {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            debug!("cannot stat {}: {}", path.display(), e);
            let status = FileStatus::Unreadable {
                reason: e.to_string(),
            };
            return (Node::file(path, 0, status), None);
        }
    };

    if let Some(filter) = &options.extensions_filter {
        if !filter.contains(&extension_of(path)) {
            return (Node::file(path, size, FileStatus::Filtered), None);
        }
    }

    let verdict = options.classifier.classify(path, size);
    if !verdict.is_likely_text() {
        let status = match verdict {
            Verdict::TooLarge => FileStatus::TooLarge,
            Verdict::Unreadable => FileStatus::Unreadable {
                reason: "cannot read file prefix".to_string(),
            },
            _ => FileStatus::Binary,
        };
        debug!("{} classified {:?}", path.display(), verdict);
        return (Node::file(path, size, status), None);
    }

    let read = read_text(path, options.encoding);
    match (read.content, read.encoding) {
        (Some(text), Some(encoding)) => (
            Node::file(path, size, FileStatus::Text { encoding }),
            Some(text),
        ),
        _ => {
            let status = match read.skip_reason {
                Some(SkipReason::Io(reason)) => FileStatus::Unreadable { reason },
                _ => FileStatus::Binary,
            };
            debug!("{} not decodable as text: {:?}", path.display(), status);
            (Node::file(path, size, status), None)
        }
    }
}

/// Invoke the caller's callback; a panic inside it is logged and ignored
fn report_progress(on_progress: &mut dyn FnMut(&ScanProgress), progress: &ScanProgress) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| on_progress(progress)));
    if outcome.is_err() {
        warn!(
            "progress callback panicked at {}; continuing",
            progress.current_path.display()
        );
    }
}

/// Runs at most one background scan at a time
///
/// Clones share the same state, so a clone handed to another thread can
/// cancel the scan this scanner is running.
#[derive(Debug, Clone)]
pub struct Scanner {
    options: Arc<ScanOptions>,
    running: Arc<AtomicBool>,
    cancel: CancelToken,
}

/// A scan running on its worker thread
#[derive(Debug)]
pub struct ScanHandle {
    thread: JoinHandle<ScanResult>,
}

impl ScanHandle {
    /// Wait for the worker and take ownership of its result
    pub fn join(self) -> Result<ScanResult, ScanError> {
        self.thread.join().map_err(|_| ScanError::WorkerPanicked)
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options: Arc::new(options),
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancelToken::new(),
        }
    }

    /// Whether a spawned scan has not finished yet
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the running scan to stop after its current file
    ///
    /// Returns `false` when no scan is running or it was already asked to
    /// stop.
    pub fn cancel(&self) -> bool {
        if !self.is_running() || self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// Start scanning `paths` on a worker thread
    ///
    /// Returns `None` without doing anything when a scan is already running.
    pub fn spawn<F>(&self, paths: Vec<PathBuf>, mut on_progress: F) -> Option<ScanHandle>
    where
        F: FnMut(&ScanProgress) + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("scan already running; ignoring new request");
            return None;
        }

        self.cancel.reset();
        let worker_cancel = self.cancel.clone();
        let options = Arc::clone(&self.options);
        let guard = RunningGuard(Arc::clone(&self.running));

        let spawned = thread::Builder::new()
            .name("tokentree-scan".to_string())
            .spawn(move || {
                let _guard = guard;
                scan(&paths, &options, &worker_cancel, &mut on_progress)
            });

        match spawned {
            Ok(thread) => Some(ScanHandle { thread }),
            Err(e) => {
                warn!("cannot start scan thread: {}", e);
                self.running.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    /// Like [`Scanner::spawn`], but a busy scanner is an error
    pub fn try_spawn<F>(&self, paths: Vec<PathBuf>, on_progress: F) -> Result<ScanHandle, ScanError>
    where
        F: FnMut(&ScanProgress) + Send + 'static,
    {
        self.spawn(paths, on_progress)
            .ok_or(ScanError::AlreadyRunning)
    }
}
