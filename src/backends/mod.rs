//! Backends module - Filesystem walking and environment checks
//!
//! Provides:
//! - walker: Two-phase directory scan with cancellation and progress
//! - doctor: Tokenizer availability report
//! - interrupt: Ctrl-C cancels the running scan

pub mod doctor;
pub mod interrupt;
pub mod walker;
