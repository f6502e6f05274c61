//! Preview flow - decoded text of one file with its token count

use anyhow::{bail, Result};
use std::path::Path;

use crate::backends::walker::{materialize, ScanOptions};
use crate::core::model::PreviewView;
use crate::core::paths::normalize_path;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::Tokenizer;
use crate::core::util::truncate_chars;

/// Characters shown before the preview is cut off
pub const PREVIEW_CHAR_LIMIT: usize = 20_000;

/// How a preview is produced
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub max_chars: usize,
    /// Also split the shown text into token pieces
    pub pieces: bool,
    pub scan: ScanOptions,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_chars: PREVIEW_CHAR_LIMIT,
            pieces: false,
            scan: ScanOptions::default(),
        }
    }
}

/// Classify and decode `path` the same way a scan would
///
/// The token count always covers the whole file; only the returned
/// content is truncated.
pub fn build_preview(path: &Path, options: &PreviewOptions, tokenizer: &Tokenizer) -> Result<PreviewView> {
    let Ok(canonical) = path.canonicalize() else {
        bail!("file not found: {}", path.display());
    };
    if canonical.is_dir() {
        bail!("not a file: {}", path.display());
    }

    let (node, content) = materialize(&canonical, &options.scan);
    let mut view = PreviewView {
        path: normalize_path(&canonical),
        size_bytes: node.size_bytes,
        status: node.status,
        encoder: tokenizer.encoder_info(),
        tokens: 0,
        char_count: 0,
        truncated: false,
        shown_chars: 0,
        content: None,
        pieces: None,
    };

    if let Some(text) = content {
        let (shown, truncated) = truncate_chars(&text, options.max_chars);
        view.tokens = tokenizer.count(&text);
        view.char_count = text.chars().count();
        view.truncated = truncated;
        view.shown_chars = shown.chars().count();
        if options.pieces {
            view.pieces = tokenizer.details(&shown).pieces;
        }
        view.content = Some(shown);
    }

    Ok(view)
}

/// Run the preview command
pub fn run_preview(
    path: &Path,
    options: &PreviewOptions,
    tokenizer: &Tokenizer,
    config: RenderConfig,
) -> Result<()> {
    let view = build_preview(path, options, tokenizer)?;

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_preview(&view));
    Ok(())
}
