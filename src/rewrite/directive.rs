//! Dependency directives found in class bodies.
//!
//! A directive is an object property whose key is one of a fixed set of
//! names (`requires`, `mixins`, `extend`, ...) and whose value is a string,
//! an array of strings or, for kinds that allow it, an object of strings.
//! Extraction is a pure walk over the tree; nothing is resolved here.

use indexmap::IndexMap;
use tree_sitter::Node;

use crate::parser::{descendants, enclosing_statement, string_value, ParsedFile, Span};

/// Directive property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Requires,
    Mixins,
    Override,
    Extend,
    Uses,
    Stores,
    Controllers,
    Controller,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 8] = [
        DirectiveKind::Requires,
        DirectiveKind::Mixins,
        DirectiveKind::Override,
        DirectiveKind::Extend,
        DirectiveKind::Uses,
        DirectiveKind::Stores,
        DirectiveKind::Controllers,
        DirectiveKind::Controller,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Requires => "requires",
            DirectiveKind::Mixins => "mixins",
            DirectiveKind::Override => "override",
            DirectiveKind::Extend => "extend",
            DirectiveKind::Uses => "uses",
            DirectiveKind::Stores => "stores",
            DirectiveKind::Controllers => "controllers",
            DirectiveKind::Controller => "controller",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-kind handling of a directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveOptions {
    /// Strip the property from the source once it produced references.
    pub remove: bool,
    /// Accept `{ key: 'Class.Name' }` values.
    pub allow_object: bool,
    /// Insert references after the enclosing statement instead of before.
    pub end: bool,
    /// Prepended to bare (dot-less) names.
    pub prefix: Option<String>,
}

/// The directive kinds recognized by the rewriter and how each is handled.
#[derive(Debug, Clone)]
pub struct DirectiveTable {
    entries: IndexMap<DirectiveKind, DirectiveOptions>,
}

impl DirectiveTable {
    /// The standard table. `namespace` prefixes bare store and controller
    /// names (`Users` becomes `<namespace>.store.Users`).
    pub fn new(namespace: &str) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(
            DirectiveKind::Requires,
            DirectiveOptions {
                remove: true,
                ..Default::default()
            },
        );
        entries.insert(
            DirectiveKind::Mixins,
            DirectiveOptions {
                allow_object: true,
                ..Default::default()
            },
        );
        entries.insert(DirectiveKind::Override, DirectiveOptions::default());
        entries.insert(DirectiveKind::Extend, DirectiveOptions::default());
        entries.insert(
            DirectiveKind::Uses,
            DirectiveOptions {
                end: true,
                ..Default::default()
            },
        );
        entries.insert(
            DirectiveKind::Stores,
            DirectiveOptions {
                prefix: Some(format!("{}.store.", namespace)),
                ..Default::default()
            },
        );
        entries.insert(
            DirectiveKind::Controllers,
            DirectiveOptions {
                prefix: Some(format!("{}.controller.", namespace)),
                ..Default::default()
            },
        );
        entries.insert(DirectiveKind::Controller, DirectiveOptions::default());
        Self { entries }
    }

    pub fn options(&self, kind: DirectiveKind) -> Option<&DirectiveOptions> {
        self.entries.get(&kind)
    }

    pub fn options_mut(&mut self, kind: DirectiveKind) -> Option<&mut DirectiveOptions> {
        self.entries.get_mut(&kind)
    }

    /// Recognize `key`, returning the kind and its options.
    pub fn lookup(&self, key: &str) -> Option<(DirectiveKind, &DirectiveOptions)> {
        let kind = DirectiveKind::from_key(key)?;
        self.entries.get(&kind).map(|opts| (kind, opts))
    }
}

/// One directive occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// String payloads in source order.
    pub values: Vec<String>,
    /// The whole `key: value` property.
    pub property: Span,
    /// The nearest enclosing expression statement, or the program.
    pub statement: Span,
}

/// Collect every directive in the file, in pre-order.
///
/// Properties whose payload has an unsupported shape are skipped.
pub fn extract_directives(parsed: &ParsedFile, table: &DirectiveTable) -> Vec<Directive> {
    descendants(parsed.root())
        .into_iter()
        .filter(|node| node.kind() == "pair")
        .filter_map(|pair| directive_at(parsed, table, pair))
        .collect()
}

fn directive_at(parsed: &ParsedFile, table: &DirectiveTable, pair: Node) -> Option<Directive> {
    let key = pair.child_by_field_name("key")?;
    if key.kind() != "property_identifier" {
        return None;
    }
    let (kind, options) = table.lookup(parsed.node_text(key))?;
    let value = pair.child_by_field_name("value")?;

    let values: Vec<String> = match value.kind() {
        "string" => string_value(value, &parsed.source).into_iter().collect(),
        "array" => value
            .named_children(&mut value.walk())
            .filter_map(|n| string_value(n, &parsed.source))
            .collect(),
        "object" if options.allow_object => value
            .named_children(&mut value.walk())
            .filter(|n| n.kind() == "pair")
            .filter_map(|n| n.child_by_field_name("value"))
            .filter_map(|n| string_value(n, &parsed.source))
            .collect(),
        _ => return None,
    };

    Some(Directive {
        kind,
        values,
        property: Span::from_node(pair),
        statement: Span::from_node(enclosing_statement(pair)),
    })
}
