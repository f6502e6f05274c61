//! Text/binary classification
//!
//! Extension lists decide most files without touching their content; only
//! files with an unknown extension get their first bytes sniffed for NULs.

use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Files above this size are never read (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Number of leading bytes inspected by the content heuristic
pub const DEFAULT_SNIFF_LEN: usize = 1024;

/// More NUL bytes than this in the sniffed prefix means binary
pub const DEFAULT_MAX_NULL_BYTES: usize = 5;

/// Outcome of classifying one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Zero-byte file, trivially text
    Empty,
    /// Extension is on the text allow-list
    KnownText,
    /// Extension is on the binary deny-list
    KnownBinary,
    /// Larger than the size threshold
    TooLarge,
    /// Unknown extension, prefix has few or no NUL bytes
    LikelyText,
    /// Unknown extension, prefix has too many NUL bytes
    LikelyBinary,
    /// Prefix could not be read
    Unreadable,
}

impl Verdict {
    /// Whether the file should be read and decoded
    pub fn is_likely_text(self) -> bool {
        matches!(
            self,
            Verdict::Empty | Verdict::KnownText | Verdict::LikelyText
        )
    }
}

/// Classifier thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    pub max_file_size: u64,
    pub sniff_len: usize,
    pub max_null_bytes: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            sniff_len: DEFAULT_SNIFF_LEN,
            max_null_bytes: DEFAULT_MAX_NULL_BYTES,
        }
    }
}

impl Classifier {
    /// Classify `path` whose size on disk is `size_bytes`
    pub fn classify(&self, path: &Path, size_bytes: u64) -> Verdict {
        if size_bytes == 0 {
            return Verdict::Empty;
        }

        let ext = extension_of(path);
        if is_binary_extension(&ext) {
            return Verdict::KnownBinary;
        }
        if size_bytes > self.max_file_size {
            return Verdict::TooLarge;
        }
        if is_text_extension(&ext) {
            return Verdict::KnownText;
        }

        match self.sniff(path) {
            Ok(nulls) if nulls > self.max_null_bytes => Verdict::LikelyBinary,
            Ok(_) => Verdict::LikelyText,
            Err(e) => {
                debug!("cannot sniff {}: {}", path.display(), e);
                Verdict::Unreadable
            }
        }
    }

    fn sniff(&self, path: &Path) -> std::io::Result<usize> {
        let file = File::open(path)?;
        let mut prefix = Vec::with_capacity(self.sniff_len);
        file.take(self.sniff_len as u64).read_to_end(&mut prefix)?;
        Ok(count_null_bytes(&prefix))
    }
}

/// Lower-cased extension with its leading dot, or `""` when there is none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn count_null_bytes(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == 0).count()
}

/// Extensions read as text without sniffing
pub fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext.trim_start_matches('.'),
        "txt" | "md" | "markdown" | "rst" | "adoc" | "org" | "tex" | "log"
            | "csv" | "tsv"
            // web
            | "html" | "htm" | "css" | "scss" | "sass" | "less" | "js" | "mjs" | "cjs" | "jsx"
            | "ts" | "tsx" | "vue" | "svelte" | "svg" | "xml"
            // data and config
            | "json" | "jsonc" | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" | "env"
            | "properties" | "lock"
            // source
            | "py" | "pyi" | "rs" | "go" | "c" | "h" | "cpp" | "cc" | "hpp" | "cs" | "java"
            | "kt" | "kts" | "scala" | "swift" | "rb" | "php" | "pl" | "lua" | "r" | "dart"
            | "zig" | "sql" | "graphql" | "proto"
            // scripts
            | "sh" | "bash" | "zsh" | "fish" | "ps1" | "bat" | "cmd"
    )
}

/// Extensions treated as binary without reading
pub fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext.trim_start_matches('.'),
        // images
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "ico" | "tif" | "tiff" | "webp" | "psd"
            | "heic" | "avif"
            // audio and video
            | "mp3" | "wav" | "flac" | "ogg" | "m4a" | "mp4" | "mkv" | "avi" | "mov" | "webm"
            // archives
            | "zip" | "gz" | "tgz" | "bz2" | "xz" | "zst" | "7z" | "rar" | "tar" | "jar"
            | "whl"
            // compiled
            | "exe" | "dll" | "so" | "dylib" | "o" | "a" | "lib" | "obj" | "class" | "pyc"
            | "pyo" | "wasm" | "bin"
            // documents and data stores
            | "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "db" | "sqlite"
            | "sqlite3"
            // fonts and images of disks
            | "ttf" | "otf" | "woff" | "woff2" | "eot" | "iso" | "dmg" | "img"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> (std::path::PathBuf, u64) {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        (path, bytes.len() as u64)
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b/Main.PY")), ".py");
        assert_eq!(extension_of(Path::new("Makefile")), "");
        assert_eq!(extension_of(Path::new(".gitignore")), "");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
    }

    #[test]
    fn test_extension_lists() {
        assert!(is_text_extension(".py"));
        assert!(is_text_extension("md"));
        assert!(!is_text_extension(".png"));
        assert!(is_binary_extension(".png"));
        assert!(!is_binary_extension(".rs"));
        assert!(!is_binary_extension(""));
    }

    #[test]
    fn test_known_extensions_skip_content() {
        let dir = TempDir::new().unwrap();
        let classifier = Classifier::default();

        // content full of NULs does not matter for an allow-listed extension
        let (py, size) = write(&dir, "a.py", &[0u8; 64]);
        assert_eq!(classifier.classify(&py, size), Verdict::KnownText);

        let (png, size) = write(&dir, "b.png", b"plain text really");
        assert_eq!(classifier.classify(&png, size), Verdict::KnownBinary);
        assert!(!classifier.classify(&png, size).is_likely_text());
    }

    #[test]
    fn test_null_byte_heuristic() {
        let dir = TempDir::new().unwrap();
        let classifier = Classifier::default();

        let mut six_nulls = b"header".to_vec();
        six_nulls.extend_from_slice(&[0u8; 6]);
        let (bin, size) = write(&dir, "blob.xyz", &six_nulls);
        assert_eq!(classifier.classify(&bin, size), Verdict::LikelyBinary);

        let mut five_nulls = b"header".to_vec();
        five_nulls.extend_from_slice(&[0u8; 5]);
        let (edge, size) = write(&dir, "edge.xyz", &five_nulls);
        assert_eq!(classifier.classify(&edge, size), Verdict::LikelyText);

        let (text, size) = write(&dir, "notes.xyz", b"no nulls here");
        assert_eq!(classifier.classify(&text, size), Verdict::LikelyText);
    }

    #[test]
    fn test_nulls_beyond_sniff_window_are_ignored() {
        let dir = TempDir::new().unwrap();
        let classifier = Classifier::default();

        let mut bytes = vec![b'a'; DEFAULT_SNIFF_LEN];
        bytes.extend_from_slice(&[0u8; 32]);
        let (path, size) = write(&dir, "late.xyz", &bytes);
        assert_eq!(classifier.classify(&path, size), Verdict::LikelyText);
    }

    #[test]
    fn test_size_threshold() {
        let classifier = Classifier {
            max_file_size: 8,
            ..Default::default()
        };
        let dir = TempDir::new().unwrap();
        let (path, size) = write(&dir, "big.txt", b"more than eight bytes");
        assert_eq!(classifier.classify(&path, size), Verdict::TooLarge);
    }

    #[test]
    fn test_empty_file_is_text() {
        let dir = TempDir::new().unwrap();
        let (path, size) = write(&dir, "empty.png", b"");
        assert_eq!(Classifier::default().classify(&path, size), Verdict::Empty);
    }

    #[test]
    fn test_unreadable_file() {
        let classifier = Classifier::default();
        let verdict = classifier.classify(Path::new("/nonexistent/blob.xyz"), 10);
        assert_eq!(verdict, Verdict::Unreadable);
        assert!(!verdict.is_likely_text());
    }
}
