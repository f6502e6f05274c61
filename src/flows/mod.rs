//! Flows module - Views built on top of a completed scan
//!
//! Provides:
//! - report: The scan pipeline and the tree + summary view
//! - files: Flat file list with filtering and sorting
//! - extensions: Per-extension totals
//! - preview: Decoded content of a single file

pub mod extensions;
pub mod files;
pub mod preview;
pub mod report;
