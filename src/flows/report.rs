//! Scan report flow - walk, count, aggregate, then render the tree view
//!
//! [`execute`] is the pipeline every view shares: it runs the walk on a
//! background scanner while a progress bar follows along on stderr, then
//! counts tokens and aggregates totals on the caller's thread.

use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::backends::walker::{validate_root, ScanOptions, ScanProgress, ScanResult, Scanner};
use crate::core::aggregate::{aggregate, count_tokens};
use crate::core::model::{NodeView, ScanReport, ScanSummary};
use crate::core::paths::{display_name, normalize_path};
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::Tokenizer;

/// What to scan, and the scanner that walks it
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// One directory root, or any mix of files and directories
    pub paths: Vec<PathBuf>,
    /// Shared with the interrupt handler so Ctrl-C can cancel the walk
    pub scanner: Scanner,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

impl ScanRequest {
    pub fn new(paths: Vec<PathBuf>, options: ScanOptions) -> Self {
        Self {
            paths,
            scanner: Scanner::new(options),
            progress: false,
        }
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Scan, count tokens and aggregate
///
/// A single path must be an existing directory; with several paths the
/// missing ones are dropped and the rest are scanned under their common
/// ancestor.
pub fn execute(request: &ScanRequest, tokenizer: &Tokenizer) -> Result<ScanResult> {
    let paths = match request.paths.as_slice() {
        [single] => vec![validate_root(single)?],
        many => many.to_vec(),
    };

    let bar = progress_bar(request.progress);
    let handle = {
        let bar = bar.clone();
        request.scanner.try_spawn(paths, move |p: &ScanProgress| {
            bar.set_length(p.total as u64);
            bar.set_position(p.done as u64);
            bar.set_message(display_name(&p.current_path));
        })?
    };
    let mut result = handle.join()?;
    bar.finish_and_clear();

    if result.cancelled {
        warn!(
            "scan cancelled after {} of {} files",
            result.processed_file_count, result.total_file_count
        );
    }

    let counted = count_tokens(&mut result.tree, &result.file_contents, tokenizer);
    let total = aggregate(&mut result.tree);
    info!(
        "{} text files, {} tokens ({})",
        result.text_file_count(),
        total,
        tokenizer.encoder_info()
    );
    debug_assert_eq!(counted, total);

    Ok(result)
}

/// Turn an aggregated scan result into the `scan` view
pub fn build_report(result: &ScanResult, tokenizer: &Tokenizer) -> ScanReport {
    let has_root = !result.root_path.as_os_str().is_empty();

    let summary = ScanSummary {
        root_path: normalize_path(&result.root_path),
        scanned_at: Utc::now(),
        encoder: tokenizer.encoder_info(),
        text_file_count: result.text_file_count(),
        total_file_count: result.total_file_count,
        processed_file_count: result.processed_file_count,
        total_tokens: result.tree.root_node().total_recursive_tokens,
        total_text_bytes: result.total_text_bytes(),
        unique_extension_count: result.all_extensions.len(),
        extensions: result.all_extensions.iter().cloned().collect(),
        cancelled: result.cancelled,
    };

    ScanReport {
        summary,
        tree: has_root.then(|| NodeView::from_tree(&result.tree, result.tree.root())),
    }
}

/// Run the scan command
pub fn run_report(request: &ScanRequest, tokenizer: &Tokenizer, config: RenderConfig) -> Result<()> {
    let result = execute(request, tokenizer)?;
    let report = build_report(&result, tokenizer);

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_report(&report));
    Ok(())
}
