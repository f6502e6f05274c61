//! Core module - Contains the fundamental data structures and algorithms
//!
//! This module provides:
//! - Token counting with a fallback estimate (tokenizer)
//! - Text/binary classification and content decoding (classify, file_reader)
//! - Path normalization and multi-root unification (paths)
//! - The arena scan tree and recursive token aggregation (tree, aggregate)
//! - Output records and their renderers (model, render)

pub mod aggregate;
pub mod classify;
pub mod file_reader;
pub mod model;
pub mod paths;
pub mod render;
pub mod tokenizer;
pub mod tree;
pub mod util;
