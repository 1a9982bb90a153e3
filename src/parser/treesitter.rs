//! Tree-sitter based JavaScript parsing.
//!
//! Sources are parsed with the tree-sitter JavaScript grammar. Unlike the
//! grammar itself, which recovers from syntax errors, `parse` rejects any
//! tree containing ERROR or MISSING nodes: downstream byte offsets are only
//! meaningful for well-formed input.

use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser as TsParser};

use super::ParsedFile;
use crate::error::{Error, Result};

static JAVASCRIPT: Lazy<Language> = Lazy::new(|| tree_sitter_javascript::LANGUAGE.into());

/// The tree-sitter JavaScript language.
pub fn language() -> &'static Language {
    &*JAVASCRIPT
}

/// Parse JavaScript source into a tree, failing on syntax errors.
pub fn parse(path: &str, source: &str) -> Result<ParsedFile> {
    let mut parser = TsParser::new();
    parser
        .set_language(&JAVASCRIPT)
        .map_err(|e| parse_error(path, e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_error(path, "parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let message = match first_error(root) {
            Some(node) => {
                let pos = node.start_position();
                if node.is_missing() {
                    format!("missing {} at {}:{}", node.kind(), pos.row + 1, pos.column + 1)
                } else {
                    format!("unexpected syntax at {}:{}", pos.row + 1, pos.column + 1)
                }
            }
            None => "syntax error".to_string(),
        };
        return Err(parse_error(path, message));
    }

    Ok(ParsedFile {
        tree,
        source: source.as_bytes().to_vec(),
        path: path.to_string(),
    })
}

fn parse_error(path: &str, message: String) -> Error {
    Error::Parse {
        path: path.to_string(),
        message,
    }
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    descendants(root)
        .into_iter()
        .find(|n| n.is_error() || n.is_missing())
}

/// Collect `root` and every node below it in pre-order.
pub fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut cursor = root.walk();

    loop {
        nodes.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
        }
    }
}

/// The nearest expression statement containing `node`, or the program node.
pub fn enclosing_statement(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    loop {
        if matches!(current.kind(), "expression_statement" | "program") {
            return current;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// The value of a string literal node, with escapes decoded.
///
/// Returns None for anything that is not a plain `'...'` or `"..."` literal;
/// template strings are not considered string literals.
pub fn string_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let raw = node.utf8_text(source).ok()?;
    let inner = raw.get(1..raw.len().saturating_sub(1))?;
    Some(unescape(inner))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex);
            }
            // Line continuation
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn push_code_point(out: &mut String, hex: &str) {
    if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        out.push(c);
    }
}
