//! File content decoding
//!
//! Reads a file that the classifier judged likely-text and decodes it with
//! the first encoding of its [`EncodingStrategy`] that succeeds. A file that
//! no accepted encoding can decode is reported as a decode failure, which
//! the scanner records as binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Strategy for decoding file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingStrategy {
    /// UTF-8 only; anything else is binary
    Strict,
    /// UTF-8, then ISO-8859-1, then Windows-1252, then UTF-16
    ///
    /// ISO-8859-1 maps every byte, so non-UTF-8 content always ends up
    /// decoded as ISO-8859-1.
    #[default]
    Fallback,
    /// UTF-8, then UTF-16 with BOM, then Windows-1252, then ISO-8859-1
    Detect,
}

impl EncodingStrategy {
    /// Decoders tried, in order, once UTF-8 has failed
    fn fallbacks(self) -> &'static [Decoder] {
        match self {
            EncodingStrategy::Strict => &[],
            EncodingStrategy::Fallback => {
                &[Decoder::Latin1, Decoder::Windows1252, Decoder::Utf16Bom]
            }
            EncodingStrategy::Detect => {
                &[Decoder::Utf16Bom, Decoder::Windows1252, Decoder::Latin1]
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Decoder {
    Latin1,
    Windows1252,
    Utf16Bom,
}

impl Decoder {
    fn decode(self, bytes: &[u8]) -> Option<(String, TextEncoding)> {
        match self {
            Decoder::Latin1 => Some((decode_latin1(bytes), TextEncoding::Latin1)),
            Decoder::Windows1252 => {
                decode_windows_1252(bytes).map(|s| (s, TextEncoding::Windows1252))
            }
            Decoder::Utf16Bom => decode_utf16_bom(bytes),
        }
    }
}

/// The encoding a text file was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Windows1252,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Latin1 => "iso-8859-1",
        };
        write!(f, "{}", name)
    }
}

/// Why a file produced no text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Open or read failed
    Io(String),
    /// No accepted encoding could decode the bytes
    Undecodable,
}

/// Result of reading a file
#[derive(Debug, Clone)]
pub struct FileReadResult {
    /// The decoded content (if successfully read)
    pub content: Option<String>,

    /// Encoding used to decode `content`
    pub encoding: Option<TextEncoding>,

    /// Reason for skipping (if skipped)
    pub skip_reason: Option<SkipReason>,
}

impl FileReadResult {
    /// Create a successful read result
    pub fn success(content: String, encoding: TextEncoding) -> Self {
        Self {
            content: Some(content),
            encoding: Some(encoding),
            skip_reason: None,
        }
    }

    /// Create a skipped result
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            content: None,
            encoding: None,
            skip_reason: Some(reason),
        }
    }
}

/// Read and decode a whole file
pub fn read_text(path: &Path, strategy: EncodingStrategy) -> FileReadResult {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return FileReadResult::skipped(SkipReason::Io(e.to_string())),
    };

    match decode(bytes, strategy) {
        Some((content, encoding)) => FileReadResult::success(content, encoding),
        None => FileReadResult::skipped(SkipReason::Undecodable),
    }
}

/// Decode raw bytes with the given strategy
pub fn decode(bytes: Vec<u8>, strategy: EncodingStrategy) -> Option<(String, TextEncoding)> {
    let bytes = match String::from_utf8(bytes) {
        Ok(s) => return Some((s, TextEncoding::Utf8)),
        Err(e) => e.into_bytes(),
    };

    strategy
        .fallbacks()
        .iter()
        .find_map(|decoder| decoder.decode(&bytes))
}

fn decode_utf16_bom(bytes: &[u8]) -> Option<(String, TextEncoding)> {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return None;
    }

    let (little_endian, encoding) = match (bytes[0], bytes[1]) {
        (0xFF, 0xFE) => (true, TextEncoding::Utf16Le),
        (0xFE, 0xFF) => (false, TextEncoding::Utf16Be),
        _ => return None,
    };

    let units: Vec<u16> = bytes[2..]
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).ok().map(|s| (s, encoding))
}

/// Windows-1252 differs from ISO-8859-1 only in 0x80..=0x9F; five bytes in
/// that range are undefined and fail the decode.
fn decode_windows_1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => cp1252_high(b),
            _ => Some(b as char),
        })
        .collect()
}

fn cp1252_high(byte: u8) -> Option<char> {
    let c = match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => return None,
    };
    Some(c)
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_utf8_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("test.txt");
        fs::write(&file_path, "Hello, World!").unwrap();

        let result = read_text(&file_path, EncodingStrategy::Strict);
        assert_eq!(result.content.as_deref(), Some("Hello, World!"));
        assert_eq!(result.encoding, Some(TextEncoding::Utf8));
        assert!(result.skip_reason.is_none());
    }

    #[test]
    fn test_strict_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("latin.txt");
        fs::write(&file_path, [b'c', b'a', b'f', 0xE9]).unwrap();

        let result = read_text(&file_path, EncodingStrategy::Strict);
        assert!(result.content.is_none());
        assert_eq!(result.skip_reason, Some(SkipReason::Undecodable));
    }

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_fallback_prefers_latin1_after_utf8() {
        let (text, encoding) =
            decode(vec![0x93, b'h', b'i', 0x94], EncodingStrategy::Fallback).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text, "\u{93}hi\u{94}");

        let (text, encoding) =
            decode(vec![b'c', b'a', b'f', 0xE9], EncodingStrategy::Fallback).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text, "café");
    }

    #[test]
    fn test_fallback_reads_utf16_bytes_as_latin1() {
        let (text, encoding) = decode(utf16le_with_bom("hi"), EncodingStrategy::Fallback).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text.chars().count(), 6);
    }

    #[test]
    fn test_detect_decodes_cp1252() {
        let (text, encoding) =
            decode(vec![0x93, b'h', b'i', 0x94], EncodingStrategy::Detect).unwrap();
        assert_eq!(text, "\u{201C}hi\u{201D}");
        assert_eq!(encoding, TextEncoding::Windows1252);
    }

    #[test]
    fn test_detect_undefined_cp1252_byte_uses_latin1() {
        let (text, encoding) = decode(vec![b'a', 0x81], EncodingStrategy::Detect).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text.chars().count(), 2);
    }

    #[test]
    fn test_detect_decodes_utf16_with_bom() {
        let (text, encoding) = decode(utf16le_with_bom("hi"), EncodingStrategy::Detect).unwrap();
        assert_eq!(text, "hi");
        assert_eq!(encoding, TextEncoding::Utf16Le);

        let mut be = vec![0xFE, 0xFF];
        for unit in "ok".encode_utf16() {
            be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(
            decode(be, EncodingStrategy::Detect),
            Some(("ok".to_string(), TextEncoding::Utf16Be))
        );
    }

    #[test]
    fn test_empty_file_is_text() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("empty.dat");
        fs::write(&file_path, "").unwrap();

        let result = read_text(&file_path, EncodingStrategy::Strict);
        assert_eq!(result.content.as_deref(), Some(""));
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = read_text(Path::new("/nonexistent/file.txt"), EncodingStrategy::Fallback);
        assert!(result.content.is_none());
        assert!(matches!(result.skip_reason, Some(SkipReason::Io(_))));
    }

    #[test]
    fn test_encoding_strategy_default() {
        assert_eq!(EncodingStrategy::default(), EncodingStrategy::Fallback);
    }

    #[test]
    fn test_text_encoding_display() {
        assert_eq!(TextEncoding::Utf8.to_string(), "utf-8");
        assert_eq!(TextEncoding::Windows1252.to_string(), "cp1252");
    }
}
