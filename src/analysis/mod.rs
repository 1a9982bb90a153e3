//! Per-file analysis.
//!
//! A `FileAnalyzer` parses one JavaScript file and folds two surfaces into a
//! `FileRecord`: documentation tags found in comments and the top-level
//! `<root>.define(...)` registration call.

mod analyzer;
mod facts;

pub use analyzer::FileAnalyzer;
pub use facts::FileRecord;
