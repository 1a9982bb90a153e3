//! Documentation tag extraction from comments.
//!
//! Block comments opened with `/**` and every `//` line comment are treated
//! as documentation blocks. Each line starting with `@` opens a tag:
//!
//! ```text
//! /**
//!  * @class App.view.Main
//!  * @require App.model.User
//!  * @param {String} [title=Untitled] Window title
//!  */
//! // @override Ext.grid.Panel
//! ```
//!
//! A tag is split into its kind (`class`), an optional `{type}`, a name and
//! the remaining description.

/// A single `@tag` extracted from a documentation block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocTag {
    /// Tag kind without the `@` (e.g. "class", "require").
    pub tag: String,
    /// First word after the tag (or the bracketed optional name).
    pub name: String,
    /// Contents of a `{...}` type expression, empty when absent.
    pub r#type: String,
    /// Default value from `[name=default]`.
    pub default: Option<String>,
    /// Whether the name was written in brackets.
    pub optional: bool,
    pub description: String,
}

/// Parse the raw text of one comment node into documentation tags.
///
/// Plain `/* ... */` comments and `/*** ... */` banners are not documentation
/// blocks and yield no tags.
pub fn parse_comment(raw: &str) -> Vec<DocTag> {
    let body = if let Some(rest) = raw.strip_prefix("//") {
        rest
    } else if raw.starts_with("/**") && !raw.starts_with("/***") {
        let inner = &raw[3..];
        inner.strip_suffix("*/").unwrap_or(inner)
    } else {
        return Vec::new();
    };

    let mut tags: Vec<DocTag> = Vec::new();
    for line in body.lines() {
        let line = strip_line_prefix(line);
        if let Some(tag_text) = line.strip_prefix('@') {
            if let Some(tag) = parse_tag_line(tag_text) {
                tags.push(tag);
            }
        } else if let Some(last) = tags.last_mut() {
            if !line.is_empty() {
                if !last.description.is_empty() {
                    last.description.push(' ');
                }
                last.description.push_str(line);
            }
        }
    }

    tags
}

fn strip_line_prefix(line: &str) -> &str {
    let line = line.trim_start();
    let line = match line.strip_prefix('*') {
        Some(rest) if !rest.starts_with('/') => rest,
        _ => line,
    };
    line.trim()
}

fn parse_tag_line(body: &str) -> Option<DocTag> {
    let tag_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let tag = &body[..tag_end];
    if tag.is_empty() {
        return None;
    }

    let mut rest = body[tag_end..].trim_start();
    let mut parsed = DocTag {
        tag: tag.to_string(),
        ..Default::default()
    };

    if rest.starts_with('{') {
        if let Some(end) = matching_close(rest, '{', '}') {
            parsed.r#type = rest[1..end].trim().to_string();
            rest = rest[end + 1..].trim_start();
        }
    }

    if rest.starts_with('[') {
        if let Some(end) = matching_close(rest, '[', ']') {
            let inner = rest[1..end].trim();
            match inner.split_once('=') {
                Some((name, default)) => {
                    parsed.name = name.trim().to_string();
                    parsed.default = Some(default.trim().to_string());
                }
                None => parsed.name = inner.to_string(),
            }
            parsed.optional = true;
            rest = rest[end + 1..].trim_start();
        }
    } else {
        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parsed.name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();
    }

    parsed.description = rest.trim().to_string();
    Some(parsed)
}

/// Byte index of the bracket closing the one at position 0.
fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
