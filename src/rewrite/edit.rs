//! Text edits at byte offsets.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A separator left dangling after a removed property.
    static ref TRAILING_SEPARATOR: Regex = Regex::new(r"\A\s*,").unwrap();
}

/// A single change to the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { at: usize, text: String },
    Remove { start: usize, end: usize },
}

impl Edit {
    /// The offset edits are ordered by.
    pub fn end(&self) -> usize {
        match self {
            Edit::Insert { at, .. } => *at,
            Edit::Remove { end, .. } => *end,
        }
    }
}

/// Apply `edits` to `source` in descending end-offset order.
///
/// Working from the back keeps earlier offsets valid. Edits with equal end
/// offsets are applied in the order given. A removal also drops one
/// separator (`\s*,`) directly after the removed range.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.end().cmp(&a.end()));

    let mut out = source.to_string();
    for edit in edits {
        match edit {
            Edit::Insert { at, text } => {
                let at = at.min(out.len());
                out.insert_str(at, &text);
            }
            Edit::Remove { start, end } => {
                let end = end.min(out.len());
                let start = start.min(end);
                let tail = &out[end..];
                let skip = TRAILING_SEPARATOR.find(tail).map(|m| m.end()).unwrap_or(0);
                out.replace_range(start..end + skip, "");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(at: usize, text: &str) -> Edit {
        Edit::Insert {
            at,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_no_edits_is_identity() {
        assert_eq!(apply_edits("abc", Vec::new()), "abc");
    }

    #[test]
    fn test_order_independent() {
        let source = "0123456789";
        let edits = vec![
            insert(2, "<a>"),
            Edit::Remove { start: 4, end: 6 },
            insert(9, "<b>"),
            insert(0, "<c>"),
        ];
        let expected = "<c>01<a>23678<b>9";
        assert_eq!(apply_edits(source, edits.clone()), expected);

        let mut reversed = edits;
        reversed.reverse();
        assert_eq!(apply_edits(source, reversed), expected);
    }

    #[test]
    fn test_remove_strips_one_trailing_separator() {
        let source = "{ requires: ['A'] ,\n  extend: 'B', x: 1 }";
        let start = source.find("requires").unwrap();
        let end = source.find("] ").unwrap() + 1;
        let out = apply_edits(source, vec![Edit::Remove { start, end }]);
        assert_eq!(out, "{ \n  extend: 'B', x: 1 }");
    }

    #[test]
    fn test_remove_without_separator() {
        let source = "{ a: 1, requires: 'A' }";
        let start = source.find("requires").unwrap();
        let out = apply_edits(source, vec![Edit::Remove { start, end: start + 13 }]);
        assert_eq!(out, "{ a: 1,  }");
    }

    #[test]
    fn test_equal_offsets_keep_given_order() {
        let out = apply_edits("x", vec![insert(0, "a"), insert(0, "b")]);
        assert_eq!(out, "bax");
    }
}
