//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::backends::walker::{ScanOptions, DEFAULT_SKIP_DIRS};
use crate::core::classify::{Classifier, DEFAULT_MAX_FILE_SIZE};
use crate::core::file_reader::EncodingStrategy;
use crate::core::render::{OutputFormat, RenderConfig};
use crate::core::tokenizer::{TokenModel, Tokenizer};
use crate::flows::files::FileQuery;
use crate::flows::preview::{PreviewOptions, PREVIEW_CHAR_LIMIT};
use crate::flows::report::ScanRequest;

/// tokentree - count LLM tokens across a directory tree.
#[derive(Parser, Debug)]
#[command(name = "tokentree")]
#[command(
    author,
    version,
    about,
    long_about = r#"tokentree walks one or more paths, classifies every file as text or binary,
counts tokens in the text files and sums them up the directory tree.

Output formats:
- tree: indented tree with right-aligned counts plus a summary (default)
- json: a single JSON document
- jsonl: one JSON object per line (best for piping into tools)
- md: human-friendly Markdown

Examples:
    tokentree scan
    tokentree scan src docs/guide.md --format md
    tokentree files --sort tokens --desc --filter src/
    tokentree extensions --format json
    tokentree preview README.md
"#
)]
pub struct Cli {
    /// Output format (tree/json/jsonl/md).
    #[arg(
        long,
        global = true,
        default_value = "tree",
        value_name = "FORMAT",
        value_parser = ["tree", "json", "jsonl", "md", "markdown"],
        long_help = "Select the output format.\n\n\
Supported values:\n\
- tree (default)\n\
- json\n\
- jsonl\n\
- md (markdown)\n\n\
Tip: Prefer jsonl when you want stable, line-oriented output for piping."
    )]
    pub format: String,

    /// Tokenizer model (o200k/cl100k/heuristic).
    #[arg(
        long,
        global = true,
        env = "TOKENTREE_MODEL",
        default_value = "o200k",
        value_name = "MODEL",
        long_help = "Tokenizer used for counting.\n\n\
Supported values:\n\
- o200k (default): o200k_base, the gpt-4o encoding\n\
- cl100k: cl100k_base, the gpt-4 encoding\n\
- heuristic: no encoder, one token per 4 bytes\n\n\
If the encoding cannot be loaded, counts fall back to the heuristic."
    )]
    pub model: String,

    /// Disable colored output.
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. Colors are also off when stdout is not a terminal."
    )]
    pub no_color: bool,

    /// Do not draw a progress bar.
    #[arg(
        long,
        global = true,
        long_help = "Do not draw the progress bar on stderr. It is also hidden when stderr is\n\
not a terminal or --quiet is given."
    )]
    pub no_progress: bool,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Only log errors and hide the progress bar. Results are still printed to stdout."
    )]
    pub quiet: bool,

    /// Verbose mode (debug logging).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log debug diagnostics to stderr, such as skipped symlinks and files that\n\
could not be decoded. RUST_LOG overrides this."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on tree/md formats."
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that scans
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Paths to scan (files and/or directories).
    #[arg(
        value_name = "PATH",
        default_value = ".",
        num_args = 0..,
        long_help = "Paths to scan.\n\n\
A single path must be an existing directory. Several paths may mix files and\n\
directories; they are shown under their common ancestor and missing ones are skipped."
    )]
    pub paths: Vec<PathBuf>,

    /// Honor .gitignore and .ignore files.
    #[arg(
        long,
        env = "TOKENTREE_GITIGNORE",
        long_help = "Skip paths matched by .gitignore, .ignore and global git excludes.\n\n\
Off by default: every file is counted."
    )]
    pub gitignore: bool,

    /// Skip dotfiles and dot-directories.
    #[arg(long)]
    pub no_hidden: bool,

    /// Extra directory name to skip (repeatable).
    #[arg(long = "skip-dir", value_name = "NAME")]
    pub skip_dirs: Vec<String>,

    /// Do not skip the built-in directory list (.git, node_modules, target, ...).
    #[arg(long)]
    pub no_default_skips: bool,

    /// Only read files with these extensions (comma separated).
    #[arg(
        long = "ext",
        value_name = "EXT",
        value_delimiter = ',',
        long_help = "Only read files with these extensions, e.g. --ext rs,md,toml.\n\n\
Other files still appear in the tree and extension list, but their content is\n\
not read or counted. Use \"none\" for files without an extension."
    )]
    pub extensions: Vec<String>,

    /// Files larger than this are never read.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Accept UTF-8 only; other encodings count as binary.
    #[arg(
        long,
        conflicts_with = "detect_encoding",
        long_help = "Accept UTF-8 only.\n\n\
By default, files that are not valid UTF-8 are read as ISO-8859-1, which\n\
accepts every byte."
    )]
    pub strict_utf8: bool,

    /// Try UTF-16 (BOM) and Windows-1252 before ISO-8859-1.
    #[arg(
        long,
        long_help = "Decode files that are not valid UTF-8 as UTF-16 when they start with a\n\
byte-order mark, then as Windows-1252, and only then as ISO-8859-1."
    )]
    pub detect_encoding: bool,
}

/// Decoding strategy selected by the encoding flags
fn encoding_strategy(strict_utf8: bool, detect_encoding: bool) -> EncodingStrategy {
    if strict_utf8 {
        EncodingStrategy::Strict
    } else if detect_encoding {
        EncodingStrategy::Detect
    } else {
        EncodingStrategy::Fallback
    }
}

/// Normalize a user-supplied extension to the ".ext" form used internally
fn normalize_extension(raw: &str) -> String {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() || ext == "none" {
        String::new()
    } else {
        format!(".{}", ext)
    }
}

impl ScanArgs {
    pub fn to_options(&self) -> ScanOptions {
        let mut skip_dirs: BTreeSet<String> = if self.no_default_skips {
            BTreeSet::new()
        } else {
            DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()
        };
        skip_dirs.extend(self.skip_dirs.iter().cloned());

        let extensions_filter = if self.extensions.is_empty() {
            None
        } else {
            Some(self.extensions.iter().map(|e| normalize_extension(e)).collect())
        };

        ScanOptions {
            classifier: Classifier {
                max_file_size: self.max_file_size,
                ..Classifier::default()
            },
            encoding: encoding_strategy(self.strict_utf8, self.detect_encoding),
            skip_dirs,
            respect_gitignore: self.gitignore,
            include_hidden: !self.no_hidden,
            extensions_filter,
        }
    }

    pub fn to_request(&self, progress: bool) -> ScanRequest {
        ScanRequest {
            progress,
            ..ScanRequest::new(self.paths.clone(), self.to_options())
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the directory tree with token counts and a summary.
    #[command(
        long_about = "Scan PATH(s) and print every directory and file with its token count.\n\
Directories show the total of everything below them; files that were not read\n\
show their size instead. A summary with totals and the extension list follows.\n\n\
Examples:\n\
  tokentree scan\n\
  tokentree scan ~/project --gitignore\n\
  tokentree scan src README.md --format json\n"
    )]
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// List every file with its token count.
    #[command(
        long_about = "Scan PATH(s) and print a flat list of files: name, extension, tokens\n\
(or \"ignored\" and the size) and full path.\n\n\
Examples:\n\
  tokentree files --sort tokens --desc\n\
  tokentree files --filter test --text-only\n"
    )]
    Files {
        #[command(flatten)]
        scan: ScanArgs,

        /// Keep files whose relative path contains this text (case-insensitive).
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,

        /// Sort key.
        #[arg(
            long,
            default_value = "name",
            value_parser = ["name", "ext", "tokens", "size", "path"],
            value_name = "KEY"
        )]
        sort: String,

        /// Reverse the sort order.
        #[arg(long)]
        desc: bool,

        /// Hide files that were not counted.
        #[arg(long)]
        text_only: bool,
    },

    /// Summarize files, tokens and bytes per extension.
    #[command(
        long_about = "Scan PATH(s) and print one row per extension with the number of files,\n\
the tokens in its text files and the bytes on disk. Binary files count toward\n\
the file total but add no tokens.\n\n\
Example:\n\
  tokentree extensions --sort count\n"
    )]
    Extensions {
        #[command(flatten)]
        scan: ScanArgs,

        /// Sort key (descending, except ext).
        #[arg(
            long,
            default_value = "tokens",
            value_parser = ["tokens", "count", "bytes", "ext"],
            value_name = "KEY"
        )]
        sort: String,
    },

    /// Show the decoded text of one file and its token count.
    #[command(
        long_about = "Decode FILE the way a scan would and print it with its token count.\n\
Long files are cut off after --max-chars characters with a notice; the token\n\
count always covers the whole file.\n\n\
Examples:\n\
  tokentree preview src/main.rs\n\
  tokentree preview notes.txt --pieces --model cl100k\n"
    )]
    Preview {
        /// File to preview.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Maximum characters to print.
        #[arg(long, value_name = "N", default_value_t = PREVIEW_CHAR_LIMIT)]
        max_chars: usize,

        /// Also print the text split into token pieces.
        #[arg(long)]
        pieces: bool,

        /// Accept UTF-8 only.
        #[arg(long, conflicts_with = "detect_encoding")]
        strict_utf8: bool,

        /// Try UTF-16 (BOM) and Windows-1252 before ISO-8859-1.
        #[arg(long)]
        detect_encoding: bool,

        /// Files larger than this are not read.
        #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FILE_SIZE)]
        max_file_size: u64,
    },

    /// Check which tokenizer encodings are available.
    #[command(
        long_about = "Try to load every supported encoding and report which ones work.\n\n\
When the selected model is unavailable, counts fall back to one token per 4 bytes."
    )]
    Doctor,
}

/// Install the stderr logger; RUST_LOG takes precedence over -v/-q
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the CLI
/// Let Ctrl-C cancel the walk this request will run
fn interruptible(request: ScanRequest) -> ScanRequest {
    crate::backends::interrupt::cancel_on_interrupt(request.scanner.clone());
    request
}

pub fn run(cli: Cli) -> Result<()> {
    // Parse output format
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let color = !cli.no_color && std::io::stdout().is_terminal();
    if !color {
        colored::control::set_override(false);
    }
    let render_config = RenderConfig::with_pretty(format, cli.pretty).with_color(color);

    let model: TokenModel = cli.model.parse().map_err(anyhow::Error::msg)?;
    let progress = !cli.no_progress && !cli.quiet && std::io::stderr().is_terminal();

    match cli.command {
        Commands::Doctor => crate::backends::doctor::run_doctor(model, render_config),

        Commands::Scan { scan } => {
            let tokenizer = Tokenizer::new(model);
            crate::flows::report::run_report(
                &interruptible(scan.to_request(progress)),
                &tokenizer,
                render_config,
            )
        }

        Commands::Files {
            scan,
            filter,
            sort,
            desc,
            text_only,
        } => {
            let tokenizer = Tokenizer::new(model);
            let query = FileQuery {
                filter,
                sort: sort.parse().unwrap_or_default(),
                descending: desc,
                text_only,
            };
            crate::flows::files::run_files(
                &interruptible(scan.to_request(progress)),
                &tokenizer,
                &query,
                render_config,
            )
        }

        Commands::Extensions { scan, sort } => {
            let tokenizer = Tokenizer::new(model);
            crate::flows::extensions::run_extensions(
                &interruptible(scan.to_request(progress)),
                &tokenizer,
                sort.parse().unwrap_or_default(),
                render_config,
            )
        }

        Commands::Preview {
            file,
            max_chars,
            pieces,
            strict_utf8,
            detect_encoding,
            max_file_size,
        } => {
            let tokenizer = Tokenizer::new(model);
            let mut options = PreviewOptions {
                max_chars,
                pieces,
                ..Default::default()
            };
            options.scan.classifier.max_file_size = max_file_size;
            options.scan.encoding = encoding_strategy(strict_utf8, detect_encoding);
            crate::flows::preview::run_preview(&file, &options, &tokenizer, render_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("rs"), ".rs");
        assert_eq!(normalize_extension(".MD"), ".md");
        assert_eq!(normalize_extension("none"), "");
    }

    #[test]
    fn test_scan_args_defaults() {
        let cli = parse(&["tokentree", "scan"]);
        let Commands::Scan { scan } = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(scan.paths, vec![PathBuf::from(".")]);

        let options = scan.to_options();
        assert!(options.skip_dirs.contains("node_modules"));
        assert!(options.include_hidden);
        assert!(!options.respect_gitignore);
        assert_eq!(options.encoding, EncodingStrategy::Fallback);
        assert!(options.extensions_filter.is_none());
        assert_eq!(options.classifier.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_scan_args_overrides() {
        let cli = parse(&[
            "tokentree",
            "files",
            "a",
            "b",
            "--ext",
            "rs,.MD",
            "--skip-dir",
            "fixtures",
            "--no-default-skips",
            "--strict-utf8",
            "--no-hidden",
        ]);
        let Commands::Files { scan, .. } = cli.command else {
            panic!("expected files");
        };
        let options = scan.to_options();
        assert_eq!(scan.paths.len(), 2);
        assert_eq!(
            options.skip_dirs.into_iter().collect::<Vec<_>>(),
            vec!["fixtures"]
        );
        let filter = options.extensions_filter.unwrap();
        assert!(filter.contains(".rs") && filter.contains(".md"));
        assert_eq!(options.encoding, EncodingStrategy::Strict);
        assert!(!options.include_hidden);
    }

    #[test]
    fn test_encoding_flags() {
        let cli = parse(&["tokentree", "scan", "--detect-encoding"]);
        let Commands::Scan { scan } = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(scan.to_options().encoding, EncodingStrategy::Detect);

        assert!(Cli::try_parse_from([
            "tokentree",
            "scan",
            "--strict-utf8",
            "--detect-encoding"
        ])
        .is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["tokentree", "scan", "--format", "json", "--model", "heuristic"]);
        assert_eq!(cli.format, "json");
        assert_eq!(cli.model, "heuristic");
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(Cli::try_parse_from(["tokentree", "--format", "raw", "scan"]).is_err());
    }
}
