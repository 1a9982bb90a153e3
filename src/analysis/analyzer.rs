//! Extraction of class identity, dependencies and overrides from one file.
//!
//! Two independent surfaces feed a `FileRecord`:
//!
//! 1. Documentation tags in comments (`@class`, `@define`, `@require`,
//!    `@mixins`, `@override`).
//! 2. A top-level registration call:
//!
//! ```text
//! Ext.define('App.view.Main', {
//!     alternateClassName: 'MainView',
//!     extend: 'Ext.panel.Panel',
//!     requires: ['App.model.User'],
//!     uses: 'App.util.Format',
//!     override: 'Ext.Component'
//! });
//! ```

use std::fs;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::FileRecord;
use crate::error::{Error, Result};
use crate::parser::{self, parse_comment, string_value, treesitter, DocTag, ParsedFile, Span};

const NAME_TAGS: &[&str] = &["define", "class"];
const REQUIRE_TAGS: &[&str] = &["require", "mixins"];
const OVERRIDE_TAGS: &[&str] = &["override"];

const COMMENT_QUERY: &str = "(comment) @comment";

/// Analyzer for a single source file.
#[derive(Debug, Clone)]
pub struct FileAnalyzer {
    root: String,
    ignore_overrides: bool,
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new("Ext")
    }
}

impl FileAnalyzer {
    /// Create an analyzer for classes registered through `<root>.define`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ignore_overrides: false,
        }
    }

    /// Skip the `override` property of registration calls.
    pub fn ignore_overrides(mut self, ignore: bool) -> Self {
        self.ignore_overrides = ignore;
        self
    }

    /// Read and analyze a file from disk.
    pub fn analyze_file(&self, path: &Path) -> Result<FileRecord> {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.analyze(&path.to_string_lossy(), &source)
    }

    /// Analyze source text. `src` becomes the record's path identity.
    pub fn analyze(&self, src: &str, source: &str) -> Result<FileRecord> {
        let parsed = parser::parse(src, source)?;
        let mut record = FileRecord::new(src);

        for tag in self.extract_tags(&parsed)? {
            self.apply_tag(&mut record, &tag);
        }
        self.extract_registrations(&parsed, &mut record);

        Ok(record)
    }

    fn extract_tags(&self, parsed: &ParsedFile) -> Result<Vec<DocTag>> {
        let query = Query::new(treesitter::language(), COMMENT_QUERY).map_err(|e| {
            Error::Parse {
                path: parsed.path.clone(),
                message: e.to_string(),
            }
        })?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.root(), &parsed.source[..]);

        let mut tags = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                tags.extend(parse_comment(parsed.node_text(capture.node)));
            }
        }
        Ok(tags)
    }

    fn apply_tag(&self, record: &mut FileRecord, tag: &DocTag) {
        if tag.tag == "class" && self.is_root_class(&tag.name) && !self.is_root_file(&record.src) {
            return;
        }

        if NAME_TAGS.contains(&tag.tag.as_str()) {
            record.add_name(&tag.name);
        }
        if REQUIRE_TAGS.contains(&tag.tag.as_str()) {
            record.add_require(&tag.name);
        }
        if OVERRIDE_TAGS.contains(&tag.tag.as_str()) {
            record.set_override(&tag.name);
        }
    }

    fn is_root_class(&self, name: &str) -> bool {
        name == self.root || name.strip_prefix(self.root.as_str()) == Some(".Widget")
    }

    fn is_root_file(&self, src: &str) -> bool {
        Path::new(src)
            .file_name()
            .map(|n| n.to_string_lossy() == format!("{}.js", self.root))
            .unwrap_or(false)
    }

    fn extract_registrations(&self, parsed: &ParsedFile, record: &mut FileRecord) {
        let root = parsed.root();
        for stmt in root.named_children(&mut root.walk()) {
            if stmt.kind() != "expression_statement" {
                continue;
            }
            let Some(call) = stmt.named_child(0) else {
                continue;
            };
            let Some(args) = self.registration_arguments(parsed, call) else {
                continue;
            };

            let mut args = args.into_iter();
            let Some(name) = args.next().and_then(|n| string_value(n, &parsed.source)) else {
                continue;
            };
            record.add_name(&name);

            for arg in args.filter(|n| n.kind() == "object") {
                for pair in arg.named_children(&mut arg.walk()) {
                    if pair.kind() == "pair" {
                        self.apply_property(parsed, record, pair);
                    }
                }
            }
        }
    }

    /// Arguments of a `<root>.define(...)` call, comments skipped.
    fn registration_arguments<'a>(
        &self,
        parsed: &ParsedFile,
        call: Node<'a>,
    ) -> Option<Vec<Node<'a>>> {
        if call.kind() != "call_expression" {
            return None;
        }
        let callee = call.child_by_field_name("function")?;
        if callee.kind() != "member_expression" {
            return None;
        }
        let object = callee.child_by_field_name("object")?;
        let property = callee.child_by_field_name("property")?;
        if object.kind() != "identifier"
            || parsed.node_text(object) != self.root
            || parsed.node_text(property) != "define"
        {
            return None;
        }

        let arguments = call.child_by_field_name("arguments")?;
        let args: Vec<Node<'a>> = arguments
            .named_children(&mut arguments.walk())
            .filter(|n| n.kind() != "comment")
            .collect();
        Some(args)
    }

    fn apply_property(&self, parsed: &ParsedFile, record: &mut FileRecord, pair: Node) {
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            return;
        };
        if key.kind() != "property_identifier" {
            return;
        }

        match parsed.node_text(key) {
            "alternateClassName" => {
                for name in string_or_array(value, &parsed.source) {
                    record.add_name(&name);
                }
            }
            "requires" | "uses" => {
                for name in string_or_array(value, &parsed.source) {
                    record.add_require(&name);
                }
            }
            "extend" => match string_value(value, &parsed.source) {
                Some(name) => record.add_require(&name),
                None => tracing::warn!(
                    file = %record.src,
                    at = %Span::from_node(value),
                    "extend value is not a string literal, extended class not found"
                ),
            },
            "override" if !self.ignore_overrides => match string_value(value, &parsed.source) {
                Some(name) => record.set_override(&name),
                None => tracing::warn!(
                    file = %record.src,
                    at = %Span::from_node(value),
                    "override value is not a string literal, overridden class not found"
                ),
            },
            _ => {}
        }
    }
}

/// Strings from a string literal or an array of them. Other shapes yield nothing.
fn string_or_array(node: Node, source: &[u8]) -> Vec<String> {
    match node.kind() {
        "string" => string_value(node, source).into_iter().collect(),
        "array" => node
            .named_children(&mut node.walk())
            .filter_map(|n| string_value(n, source))
            .collect(),
        _ => Vec::new(),
    }
}
