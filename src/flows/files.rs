//! File list flow - flat, filterable, sortable list of every scanned file

use anyhow::Result;
use std::cmp::Ordering;

use crate::backends::walker::ScanResult;
use crate::core::model::FileRow;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::Tokenizer;
use crate::core::util::natural_cmp;
use crate::flows::report::{execute, ScanRequest};

/// Sort key for the file list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileSort {
    #[default]
    Name,
    Extension,
    Tokens,
    Size,
    Path,
}

impl std::str::FromStr for FileSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(FileSort::Name),
            "ext" | "extension" => Ok(FileSort::Extension),
            "tokens" => Ok(FileSort::Tokens),
            "size" | "bytes" => Ok(FileSort::Size),
            "path" => Ok(FileSort::Path),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Which rows to show and in what order
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    /// Case-insensitive substring of the relative path
    pub filter: Option<String>,
    pub sort: FileSort,
    pub descending: bool,
    /// Hide files whose content was not counted
    pub text_only: bool,
}

fn compare_rows(a: &FileRow, b: &FileRow, sort: FileSort) -> Ordering {
    let primary = match sort {
        FileSort::Name => natural_cmp(&a.name, &b.name),
        FileSort::Extension => a.extension.cmp(&b.extension),
        FileSort::Tokens => a.tokens.cmp(&b.tokens),
        FileSort::Size => a.size_bytes.cmp(&b.size_bytes),
        FileSort::Path => natural_cmp(&a.path, &b.path),
    };
    primary
        .then_with(|| natural_cmp(&a.name, &b.name))
        .then_with(|| natural_cmp(&a.path, &b.path))
}

/// Rows for every file node that passes `query`, sorted
pub fn file_rows(result: &ScanResult, query: &FileQuery) -> Vec<FileRow> {
    let root = &result.root_path;
    let needle = query.filter.as_ref().map(|f| f.to_lowercase());

    let mut rows: Vec<FileRow> = result
        .tree
        .files()
        .map(|(_, node)| FileRow::from_node(node, root))
        .filter(|row| !query.text_only || row.is_text)
        .filter(|row| match &needle {
            Some(needle) => row.path.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = compare_rows(a, b, query.sort);
        if query.descending {
            ord.reverse()
        } else {
            ord
        }
    });
    rows
}

/// Run the files command
pub fn run_files(
    request: &ScanRequest,
    tokenizer: &Tokenizer,
    query: &FileQuery,
    config: RenderConfig,
) -> Result<()> {
    let result = execute(request, tokenizer)?;
    let rows = file_rows(&result, query);

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_files(&rows));
    Ok(())
}
