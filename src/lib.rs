//! extdeps - static dependency resolution for Ext JS class trees.
//!
//! Sources written against the `Ext.define` class system declare their
//! dependencies at runtime (`requires`, `mixins`, `extend`, ...). extdeps
//! resolves them ahead of time.
//!
//! # Architecture
//!
//! - `parser`: tree-sitter JavaScript front end and doc-tag parsing
//! - `analysis`: per-file extraction of class names, requires and overrides
//! - `namespace`: the dotted-name tree and the directory indexer
//! - `registry`: queries over an indexed tree, snapshots and caches
//! - `rewrite`: path table, directives, edits, the rewriter and loader
//! - `config`: YAML configuration schema
//! - `report`: Output formatting (pretty, JSON)

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod namespace;
pub mod parser;
pub mod registry;
pub mod report;
pub mod rewrite;

pub use analysis::{FileAnalyzer, FileRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use namespace::{Indexer, NamespaceNode, PackageOptions};
pub use registry::{ClassRegistry, ClassResolver, RegistryStore};
pub use rewrite::{Loader, PathMap, PathPolicy, Rewriter};
