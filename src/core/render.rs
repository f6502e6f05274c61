//! Renderer module
//!
//! Renders the output model to different formats: tree (human text), json,
//! jsonl, md

use colored::Colorize;
use serde::Serialize;

use crate::core::model::{
    extension_label, DependencyStatus, ExtensionRow, FileRow, NodeView, PreviewView, ScanReport,
    ScanSummary,
};
use crate::core::tree::FileStatus;
use crate::core::util::format_count;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
    Jsonl,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" | "text" => Ok(OutputFormat::Tree),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
    /// ANSI colors in tree output
    pub color: bool,
}

impl RenderConfig {
    /// Create a new render config with default options
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
            color: false,
        }
    }

    /// Create a new render config with pretty option
    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self {
            pretty,
            ..Self::new(format)
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Annotation for a file whose content was not counted
pub fn ignored_label(status: &FileStatus, size_bytes: u64) -> String {
    match status {
        FileStatus::Filtered => format!("(filtered: {} bytes)", format_count(size_bytes)),
        _ => format!("(ignored/binary: {} bytes)", format_count(size_bytes)),
    }
}

struct TreeLine {
    label: String,
    count: String,
    is_dir: bool,
    ignored: bool,
}

/// Renderer for the output model
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Create a new renderer with render config
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the `scan` view: tree plus summary
    pub fn render_report(&self, report: &ScanReport) -> String {
        match self.config.format {
            OutputFormat::Tree => {
                let mut output = String::new();
                match &report.tree {
                    Some(tree) => output.push_str(&self.tree_text(tree, self.config.color)),
                    None => output.push_str("Nothing to scan.\n"),
                }
                output.push('\n');
                output.push_str(&self.summary_text(&report.summary));
                output
            }
            OutputFormat::Json => self.to_json(report),
            OutputFormat::Jsonl => {
                let mut lines = vec![self.to_json(&report.summary)];
                if let Some(tree) = &report.tree {
                    lines.extend(
                        tree.flatten()
                            .into_iter()
                            .map(|(depth, view)| self.to_json(&view.record(depth))),
                    );
                }
                self.join_lines(lines)
            }
            OutputFormat::Markdown => self.report_markdown(report),
        }
    }

    /// Render the flat file list
    pub fn render_files(&self, rows: &[FileRow]) -> String {
        match self.config.format {
            OutputFormat::Tree => self.files_text(rows),
            OutputFormat::Json => self.to_json(&rows),
            OutputFormat::Jsonl => self.to_jsonl(rows),
            OutputFormat::Markdown => {
                let mut output = String::from("## Files\n\n");
                output.push_str("| Name | Extension | Tokens | Path |\n");
                output.push_str("|------|-----------|-------:|------|\n");
                for row in rows {
                    output.push_str(&format!(
                        "| {} | {} | {} | `{}` |\n",
                        row.name,
                        extension_label(&row.extension),
                        file_tokens_cell(row),
                        row.full_path
                    ));
                }
                output
            }
        }
    }

    /// Render the per-extension table
    pub fn render_extensions(&self, rows: &[ExtensionRow]) -> String {
        match self.config.format {
            OutputFormat::Tree => self.extensions_text(rows),
            OutputFormat::Json => self.to_json(&rows),
            OutputFormat::Jsonl => self.to_jsonl(rows),
            OutputFormat::Markdown => {
                let mut output = String::from("## Extensions\n\n");
                output.push_str("| Extension | Files | Tokens | Bytes |\n");
                output.push_str("|-----------|------:|-------:|------:|\n");
                for row in rows {
                    output.push_str(&format!(
                        "| {} | {} | {} | {} |\n",
                        row.label(),
                        row.count,
                        format_count(row.tokens as u64),
                        format_count(row.bytes)
                    ));
                }
                output
            }
        }
    }

    /// Render a single file preview
    pub fn render_preview(&self, preview: &PreviewView) -> String {
        match self.config.format {
            OutputFormat::Tree => self.preview_text(preview),
            OutputFormat::Json => self.to_json(preview),
            OutputFormat::Jsonl => self.to_jsonl(std::slice::from_ref(preview)),
            OutputFormat::Markdown => {
                let mut output = format!("## `{}`\n\n", preview.path);
                match &preview.content {
                    Some(content) => {
                        output.push_str(&format!(
                            "{} tokens ({})\n\n```\n",
                            format_count(preview.tokens as u64),
                            preview.encoder
                        ));
                        output.push_str(content);
                        if !content.ends_with('\n') {
                            output.push('\n');
                        }
                        output.push_str("```\n");
                        if preview.truncated {
                            output.push_str(&format!("\n> {}\n", truncation_notice(preview)));
                        }
                    }
                    None => {
                        output.push_str(&ignored_label(&preview.status, preview.size_bytes));
                        output.push('\n');
                    }
                }
                output
            }
        }
    }

    /// Render tokenizer availability
    pub fn render_doctor(&self, deps: &[DependencyStatus]) -> String {
        match self.config.format {
            OutputFormat::Json => self.to_json(&deps),
            OutputFormat::Jsonl => self.to_jsonl(deps),
            OutputFormat::Tree | OutputFormat::Markdown => deps
                .iter()
                .map(|dep| {
                    let mark = if dep.available { "✓" } else { "✗" };
                    let mut line = format!("{} {}", mark, dep.name);
                    if dep.active {
                        line.push_str(" [active]");
                    }
                    if let Some(notes) = &dep.notes {
                        line.push_str(&format!("\n  Note: {}", notes));
                    }
                    if self.config.format == OutputFormat::Markdown {
                        format!("- {}", line)
                    } else {
                        line
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.config.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|_| "null".to_string())
    }

    fn to_jsonl<T: Serialize>(&self, items: &[T]) -> String {
        self.join_lines(items.iter().map(|item| self.to_json(item)).collect())
    }

    fn join_lines(&self, lines: Vec<String>) -> String {
        lines.join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    /// Tree with token counts right-aligned in one column
    fn tree_text(&self, root: &NodeView, color: bool) -> String {
        let mut lines = Vec::new();
        lines.push(TreeLine {
            label: format!("{}/", root.name),
            count: format_count(root.tokens as u64),
            is_dir: true,
            ignored: false,
        });
        collect_tree_lines(root, "", &mut lines);

        let label_width = lines
            .iter()
            .map(|l| l.label.chars().count())
            .max()
            .unwrap_or(0);
        let count_width = lines
            .iter()
            .map(|l| l.count.chars().count())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for line in &lines {
            let label = format!("{:<width$}", line.label, width = label_width);
            let count = format!("{:>width$}", line.count, width = count_width);
            if color {
                let label = if line.is_dir {
                    label.blue().bold().to_string()
                } else {
                    label
                };
                let count = if line.ignored {
                    count.dimmed().to_string()
                } else {
                    count.yellow().to_string()
                };
                output.push_str(&format!("{}  {}\n", label, count));
            } else {
                output.push_str(&format!("{}  {}\n", label, count));
            }
        }
        output
    }

    fn summary_text(&self, summary: &ScanSummary) -> String {
        let extensions = summary
            .extensions
            .iter()
            .map(|e| extension_label(e))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = [
            ("Root path", summary.root_path.clone()),
            ("Text files", format_count(summary.text_file_count as u64)),
            ("Total tokens", format_count(summary.total_tokens as u64)),
            ("Total bytes read", format_count(summary.total_text_bytes)),
            (
                "Unique extensions",
                format_count(summary.unique_extension_count as u64),
            ),
            ("Extensions", extensions),
            ("Encoder", summary.encoder.clone()),
        ];

        let mut output = self.heading("Summary");
        output.push('\n');
        for (key, value) in rows {
            output.push_str(&format!("  {:<19}{}\n", format!("{}:", key), value));
        }
        if summary.cancelled {
            output.push_str(&format!(
                "  Scan cancelled after {} of {} files\n",
                summary.processed_file_count, summary.total_file_count
            ));
        }
        output
    }

    fn report_markdown(&self, report: &ScanReport) -> String {
        let summary = &report.summary;
        let mut output = String::from("## Tree\n\n");
        match &report.tree {
            Some(tree) => {
                output.push_str("```\n");
                output.push_str(&self.tree_text(tree, false));
                output.push_str("```\n\n");
            }
            None => output.push_str("Nothing to scan.\n\n"),
        }

        output.push_str("## Summary\n\n");
        output.push_str("| Field | Value |\n|-------|-------|\n");
        output.push_str(&format!("| Root path | `{}` |\n", summary.root_path));
        output.push_str(&format!("| Text files | {} |\n", summary.text_file_count));
        output.push_str(&format!(
            "| Total tokens | {} |\n",
            format_count(summary.total_tokens as u64)
        ));
        output.push_str(&format!(
            "| Total bytes read | {} |\n",
            format_count(summary.total_text_bytes)
        ));
        output.push_str(&format!(
            "| Unique extensions | {} |\n",
            summary.unique_extension_count
        ));
        let extensions = summary
            .extensions
            .iter()
            .map(|e| format!("`{}`", extension_label(e)))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("| Extensions | {} |\n", extensions));
        if summary.cancelled {
            output.push_str("\n> Scan was cancelled; results are partial\n");
        }
        output
    }

    fn files_text(&self, rows: &[FileRow]) -> String {
        let headers = ["NAME", "EXT", "TOKENS", "PATH"];
        let cells: Vec<[String; 4]> = rows
            .iter()
            .map(|row| {
                [
                    row.name.clone(),
                    extension_label(&row.extension).to_string(),
                    file_tokens_cell(row),
                    row.full_path.clone(),
                ]
            })
            .collect();

        let mut widths = headers.map(|h| h.len());
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut output = self.heading(&format!(
            "{:<w0$}  {:<w1$}  {:>w2$}  {}",
            headers[0],
            headers[1],
            headers[2],
            headers[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ));
        output.push('\n');
        for row in &cells {
            output.push_str(&format!(
                "{:<w0$}  {:<w1$}  {:>w2$}  {}\n",
                row[0],
                row[1],
                row[2],
                row[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2]
            ));
        }
        output.push_str(&format!("{} files\n", rows.len()));
        output
    }

    fn extensions_text(&self, rows: &[ExtensionRow]) -> String {
        let cells: Vec<[String; 4]> = rows
            .iter()
            .map(|row| {
                [
                    row.label().to_string(),
                    format_count(row.count as u64),
                    format_count(row.tokens as u64),
                    format_count(row.bytes),
                ]
            })
            .collect();
        let headers = ["EXTENSION", "FILES", "TOKENS", "BYTES"];
        let mut widths = headers.map(|h| h.len());
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let format_row = |row: [&str; 4]| {
            format!(
                "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}",
                row[0],
                row[1],
                row[2],
                row[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3]
            )
        };

        let mut output = self.heading(&format_row(headers));
        output.push('\n');
        for row in &cells {
            output.push_str(&format_row([
                row[0].as_str(),
                row[1].as_str(),
                row[2].as_str(),
                row[3].as_str(),
            ]));
            output.push('\n');
        }
        output
    }

    fn preview_text(&self, preview: &PreviewView) -> String {
        let Some(content) = &preview.content else {
            return format!(
                "{}: {}\n",
                preview.path,
                ignored_label(&preview.status, preview.size_bytes)
            );
        };

        let encoding = preview
            .encoding()
            .map(|e| e.to_string())
            .unwrap_or_default();
        let mut output = self.heading(&format!(
            "{} ({} tokens, {}, {})",
            preview.path,
            format_count(preview.tokens as u64),
            encoding,
            preview.encoder
        ));
        output.push_str("\n\n");
        output.push_str(content);
        if preview.truncated {
            output.push_str(&format!("\n\n{}", truncation_notice(preview)));
        }
        if !output.ends_with('\n') {
            output.push('\n');
        }
        if let Some(pieces) = &preview.pieces {
            output.push('\n');
            output.push_str(&self.heading("Token pieces"));
            output.push('\n');
            let quoted: Vec<String> = pieces.iter().map(|p| format!("{:?}", p)).collect();
            output.push_str(&quoted.join(" "));
            output.push('\n');
        }
        output
    }

    fn heading(&self, text: &str) -> String {
        if self.config.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn collect_tree_lines(node: &NodeView, prefix: &str, lines: &mut Vec<TreeLine>) {
    let last_index = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let last = i == last_index;
        let connector = if last { "└── " } else { "├── " };
        let ignored = !child.is_dir && !child.is_text;
        let count = if ignored {
            ignored_label(&child.status, child.size_bytes)
        } else {
            format_count(child.tokens as u64)
        };
        let slash = if child.is_dir { "/" } else { "" };

        lines.push(TreeLine {
            label: format!("{}{}{}{}", prefix, connector, child.name, slash),
            count,
            is_dir: child.is_dir,
            ignored,
        });

        if child.is_dir {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            collect_tree_lines(child, &child_prefix, lines);
        }
    }
}

fn file_tokens_cell(row: &FileRow) -> String {
    if row.is_text {
        format_count(row.tokens as u64)
    } else {
        format!("ignored ({} bytes)", format_count(row.size_bytes))
    }
}

fn truncation_notice(preview: &PreviewView) -> String {
    format!(
        "[truncated: showing first {} of {} characters]",
        format_count(preview.shown_chars as u64),
        format_count(preview.char_count as u64)
    )
}
