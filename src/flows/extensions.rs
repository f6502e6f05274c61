//! Extension summary flow - per-extension file count, tokens and bytes

use anyhow::Result;

use crate::backends::walker::ScanResult;
use crate::core::aggregate::extension_summary;
use crate::core::model::ExtensionRow;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::Tokenizer;
use crate::flows::report::{execute, ScanRequest};

/// Sort key for the extension table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionSort {
    /// Most tokens first
    #[default]
    Tokens,
    /// Most files first
    Count,
    /// Most bytes first
    Bytes,
    /// Alphabetical
    Extension,
}

impl std::str::FromStr for ExtensionSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tokens" => Ok(ExtensionSort::Tokens),
            "count" | "files" => Ok(ExtensionSort::Count),
            "bytes" | "size" => Ok(ExtensionSort::Bytes),
            "ext" | "extension" => Ok(ExtensionSort::Extension),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// One row per extension seen in the scan
pub fn extension_rows(result: &ScanResult, sort: ExtensionSort) -> Vec<ExtensionRow> {
    let mut rows: Vec<ExtensionRow> = extension_summary(&result.tree)
        .into_iter()
        .map(|(ext, stats)| ExtensionRow::new(&ext, stats))
        .collect();

    // the summary is keyed by extension, so ties keep alphabetical order
    match sort {
        ExtensionSort::Tokens => rows.sort_by(|a, b| b.tokens.cmp(&a.tokens)),
        ExtensionSort::Count => rows.sort_by(|a, b| b.count.cmp(&a.count)),
        ExtensionSort::Bytes => rows.sort_by(|a, b| b.bytes.cmp(&a.bytes)),
        ExtensionSort::Extension => {}
    }
    rows
}

/// Run the extensions command
pub fn run_extensions(
    request: &ScanRequest,
    tokenizer: &Tokenizer,
    sort: ExtensionSort,
    config: RenderConfig,
) -> Result<()> {
    let result = execute(request, tokenizer)?;
    let rows = extension_rows(&result, sort);

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_extensions(&rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::walker::ScanOptions;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_extension_rows_sorted_by_tokens() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "x".repeat(40)).unwrap();
        fs::write(temp.path().join("b.md"), "x".repeat(80)).unwrap();
        fs::write(temp.path().join("c.rs"), "x".repeat(400)).unwrap();
        fs::write(temp.path().join("d.png"), [0u8; 10]).unwrap();
        fs::write(temp.path().join("e.png"), [0u8; 10]).unwrap();
        fs::write(temp.path().join("f.png"), [0u8; 10]).unwrap();

        let request = ScanRequest::new(vec![temp.path().to_path_buf()], ScanOptions::default());
        let result = execute(&request, &Tokenizer::heuristic()).unwrap();

        let rows = extension_rows(&result, ExtensionSort::Tokens);
        let order: Vec<_> = rows.iter().map(|r| r.extension.as_str()).collect();
        assert_eq!(order, vec![".rs", ".md", ".png"]);
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].tokens, 30);
        assert_eq!(rows[2].tokens, 0);
        assert_eq!(rows[2].bytes, 30);

        let rows = extension_rows(&result, ExtensionSort::Count);
        assert_eq!(rows[0].extension, ".png");

        let rows = extension_rows(&result, ExtensionSort::Extension);
        let order: Vec<_> = rows.iter().map(|r| r.extension.as_str()).collect();
        assert_eq!(order, vec![".md", ".png", ".rs"]);
    }

    #[test]
    fn test_extension_sort_parse() {
        assert_eq!("files".parse::<ExtensionSort>().unwrap(), ExtensionSort::Count);
        assert!("weight".parse::<ExtensionSort>().is_err());
    }
}
