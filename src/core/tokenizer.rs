//! Token counting module - the tokenizer adapter shared by the scanner views
//!
//! Wraps a tiktoken BPE encoding (o200k_base by default, the gpt-4o encoding)
//! behind a single [`Tokenizer`] value that is created once at startup and
//! passed by reference to whoever needs to count. When the encoding cannot
//! be loaded, or encoding panics, counts degrade to a bytes/4 estimate.
//!
//! Usage:
//! ```rust,ignore
//! let tokenizer = Tokenizer::new(TokenModel::default());
//! let tokens = tokenizer.count("print(1)");
//! println!("{} tokens via {}", tokens, tokenizer.encoder_info());
//! ```

use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};
use tracing::{debug, warn};

/// Bytes per token assumed by the fallback estimate
pub const FALLBACK_BYTES_PER_TOKEN: usize = 4;

/// Supported token models/encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenModel {
    /// o200k_base encoding (GPT-4o native)
    #[default]
    O200k,
    /// cl100k_base encoding (GPT-4, GPT-3.5-turbo)
    Cl100k,
    /// No BPE encoding, always use the bytes/4 estimate
    Heuristic,
}

impl TokenModel {
    /// Human readable name of the encoding behind this model
    pub fn encoding_label(&self) -> &'static str {
        match self {
            TokenModel::O200k => "o200k_base (gpt-4o)",
            TokenModel::Cl100k => "cl100k_base (gpt-4)",
            TokenModel::Heuristic => "heuristic",
        }
    }

    /// List all accepted model names
    pub fn available_models() -> &'static [&'static str] {
        &["o200k", "cl100k", "heuristic"]
    }

    fn load(&self) -> Option<Result<CoreBPE, String>> {
        match self {
            TokenModel::O200k => Some(o200k_base().map_err(|e| e.to_string())),
            TokenModel::Cl100k => Some(cl100k_base().map_err(|e| e.to_string())),
            TokenModel::Heuristic => None,
        }
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenModel::O200k => "o200k",
            TokenModel::Cl100k => "cl100k",
            TokenModel::Heuristic => "heuristic",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TokenModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "o200k" | "o200k_base" | "gpt4o" | "gpt-4o" | "default" => Ok(TokenModel::O200k),
            "cl100k" | "cl100k_base" | "gpt4" | "gpt-4" | "gpt-3.5-turbo" => {
                Ok(TokenModel::Cl100k)
            }
            "heuristic" | "fast" | "estimate" | "bytes" => Ok(TokenModel::Heuristic),
            _ => Err(format!(
                "Unknown model: {}. Available: {}",
                s,
                TokenModel::available_models().join(", ")
            )),
        }
    }
}

/// Token counts and sizes for one piece of text
#[derive(Debug, Clone, Serialize)]
pub struct TokenizationDetails {
    pub tokens: usize,
    pub byte_size: usize,
    pub encoder_info: String,
    /// Decoded token pieces, only when the real encoder is loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pieces: Option<Vec<String>>,
}

/// The tokenizer adapter
///
/// Built once per process; availability of the BPE encoding is decided at
/// construction time and reported through [`Tokenizer::is_available`].
pub struct Tokenizer {
    model: TokenModel,
    bpe: Option<CoreBPE>,
    load_error: Option<String>,
}

impl Tokenizer {
    /// Load the encoding for `model`, falling back to the estimate on failure
    pub fn new(model: TokenModel) -> Self {
        match model.load() {
            Some(Ok(bpe)) => {
                debug!("loaded {} encoding", model.encoding_label());
                Self {
                    model,
                    bpe: Some(bpe),
                    load_error: None,
                }
            }
            Some(Err(e)) => {
                warn!(
                    "failed to load {}: {}; using bytes/{} estimate",
                    model.encoding_label(),
                    e,
                    FALLBACK_BYTES_PER_TOKEN
                );
                Self {
                    model,
                    bpe: None,
                    load_error: Some(e),
                }
            }
            None => Self::heuristic(),
        }
    }

    /// A tokenizer that never loads an encoding
    pub fn heuristic() -> Self {
        Self {
            model: TokenModel::Heuristic,
            bpe: None,
            load_error: None,
        }
    }

    pub fn model(&self) -> TokenModel {
        self.model
    }

    /// Whether the real BPE encoding is in use
    pub fn is_available(&self) -> bool {
        self.bpe.is_some()
    }

    /// Why the encoding could not be loaded, if it failed
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Describe which encoder produces the counts
    pub fn encoder_info(&self) -> String {
        if self.is_available() {
            self.model.encoding_label().to_string()
        } else if self.model == TokenModel::Heuristic {
            format!("heuristic (bytes/{})", FALLBACK_BYTES_PER_TOKEN)
        } else {
            format!(
                "{} unavailable, using bytes/{} fallback",
                self.model.encoding_label(),
                FALLBACK_BYTES_PER_TOKEN
            )
        }
    }

    /// Count tokens in `text`
    ///
    /// Empty text is always 0 tokens. A panic inside the encoder is caught
    /// and that text is counted with the fallback estimate instead.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        match &self.bpe {
            Some(bpe) => {
                let encoded = panic::catch_unwind(AssertUnwindSafe(|| {
                    bpe.encode_with_special_tokens(text).len()
                }));
                match encoded {
                    Ok(count) => count,
                    Err(_) => {
                        warn!("tokenizer failed, using fallback estimate for this text");
                        estimate_tokens_fallback(text)
                    }
                }
            }
            None => estimate_tokens_fallback(text),
        }
    }

    /// Token count, byte size and token pieces for `text`
    pub fn details(&self, text: &str) -> TokenizationDetails {
        let pieces = self.bpe.as_ref().filter(|_| !text.is_empty()).and_then(|bpe| {
            panic::catch_unwind(AssertUnwindSafe(|| bpe.split_by_token(text, true)))
                .ok()
                .and_then(|split| split.ok())
        });

        TokenizationDetails {
            tokens: self.count(text),
            byte_size: text.len(),
            encoder_info: self.encoder_info(),
            pieces,
        }
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("model", &self.model)
            .field("available", &self.is_available())
            .field("load_error", &self.load_error)
            .finish()
    }
}

/// Crude estimate used when no encoder is available: one token per 4 bytes,
/// at least 1 for non-empty text.
pub fn estimate_tokens_fallback(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    std::cmp::max(1, text.len() / FALLBACK_BYTES_PER_TOKEN)
}
