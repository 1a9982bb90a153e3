//! Mapping class names to files through a prefix-keyed path table.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, Result};
use crate::registry::ClassResolver;

/// How classes under one prefix map to files.
#[derive(Clone)]
pub enum PathPolicy {
    /// Classes under the prefix are never referenced.
    Disabled,
    /// Directory the rest of the dotted name is appended to.
    Template(String),
    /// Files come from a resolver, typically a class registry.
    Resolver(Arc<dyn ClassResolver>),
}

impl fmt::Debug for PathPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPolicy::Disabled => write!(f, "Disabled"),
            PathPolicy::Template(t) => f.debug_tuple("Template").field(t).finish(),
            PathPolicy::Resolver(_) => write!(f, "Resolver(..)"),
        }
    }
}

struct PathEntry {
    prefix: String,
    pattern: Regex,
    policy: PathPolicy,
}

/// Ordered prefix table. The first prefix whose `^prefix` pattern matches a
/// class name decides how it resolves.
#[derive(Default)]
pub struct PathMap {
    entries: Vec<PathEntry>,
}

impl fmt::Debug for PathMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.prefix, &e.policy)))
            .finish()
    }
}

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prefix. Prefixes are regular expressions anchored at the
    /// start of the class name.
    pub fn insert(&mut self, prefix: &str, policy: PathPolicy) -> Result<()> {
        let pattern = Regex::new(&format!("^{}", prefix))
            .map_err(|e| Error::Config(format!("invalid path prefix {:?}: {}", prefix, e)))?;
        self.entries.push(PathEntry {
            prefix: prefix.to_string(),
            pattern,
            policy,
        });
        Ok(())
    }

    /// Builder form of `insert`.
    pub fn with(mut self, prefix: &str, policy: PathPolicy) -> Result<Self> {
        self.insert(prefix, policy)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files implementing `class_name`. Empty when no prefix matches, the
    /// matching prefix is disabled, or its resolver knows nothing.
    pub fn resolve_class_file(&self, class_name: &str) -> Vec<String> {
        let Some((entry, matched)) = self
            .entries
            .iter()
            .find_map(|e| e.pattern.find(class_name).map(|m| (e, m.end())))
        else {
            return Vec::new();
        };

        let files = match &entry.policy {
            PathPolicy::Disabled => Vec::new(),
            PathPolicy::Resolver(resolver) => resolver.resolve(class_name),
            PathPolicy::Template(template) => vec![template_path(template, &class_name[matched..])],
        };
        files.into_iter().filter(|f| !f.is_empty()).collect()
    }
}

/// `template` joined with the dotted `rest` turned into a path, plus `.js`.
fn template_path(template: &str, rest: &str) -> String {
    let rest = rest.strip_prefix('.').unwrap_or(rest).replace('.', "/");
    let base = template.trim_end_matches('/');
    match (base.is_empty(), rest.is_empty()) {
        (_, true) => format!("{}.js", base),
        (true, false) => format!("{}.js", rest),
        (false, false) => format!("{}/{}.js", base, rest),
    }
}
