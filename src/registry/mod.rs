//! Class registry and query layer.
//!
//! A `ClassRegistry` is the merged namespace tree plus the flat file map of
//! a build. It answers dotted-name lookups:
//!
//! - `App.view.Main` returns the record of the file registering that class
//! - `App.view.*` returns every class record below `App.view`
//!
//! Registries are persisted per version by a `RegistryStore`.

mod cache;
mod store;

pub use cache::{ContentCache, SnapshotCache};
pub use store::RegistryStore;

use std::collections::BTreeMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::analysis::FileRecord;
use crate::namespace::{ClassEntry, NamespaceNode, PackageIndex};

/// Anything that can map a class name to the files implementing it.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, class_name: &str) -> Vec<String>;
}

impl<F> ClassResolver for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn resolve(&self, class_name: &str) -> Vec<String> {
        self(class_name)
    }
}

/// The namespace tree and file map of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRegistry {
    #[serde(rename = "classMap")]
    pub classes: NamespaceNode,
    #[serde(rename = "fileMap")]
    pub files: BTreeMap<String, FileRecord>,
}

impl From<PackageIndex> for ClassRegistry {
    fn from(index: PackageIndex) -> Self {
        Self {
            classes: index.classes,
            files: index.files,
        }
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record of the file at `src`.
    pub fn file(&self, src: &str) -> Option<&FileRecord> {
        self.files.get(src)
    }

    pub fn class_count(&self) -> usize {
        self.classes.class_count()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Files registering `name`.
    ///
    /// An exact name yields at most one record. A trailing `*` yields the
    /// prefix's own class followed by every class record below it, each
    /// file once. Unknown names yield an empty list.
    pub fn query(&self, name: &str) -> Vec<&FileRecord> {
        self.matching_classes(name)
            .into_iter()
            .filter_map(|class| self.record(&class.src))
            .collect()
    }

    /// Like `query`, with each match followed by the file overriding it.
    pub fn query_with_overrides(&self, name: &str) -> Vec<&FileRecord> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for class in self.matching_classes(name) {
            seen.insert(class.src.as_str());
            if let Some(patch) = &class.overridden_by {
                seen.insert(patch.as_str());
            }
        }
        seen.into_iter().filter_map(|src| self.record(src)).collect()
    }

    fn matching_classes(&self, name: &str) -> Vec<&ClassEntry> {
        let (base, wildcard) = match name.strip_suffix('*') {
            Some(base) => (base.trim_end_matches('.'), true),
            None => (name, false),
        };
        let Some(node) = self.classes.get(base) else {
            return Vec::new();
        };

        if !wildcard {
            return node.class.iter().collect();
        }

        let mut seen = IndexSet::new();
        node.class
            .iter()
            .chain(node.classes_below())
            .filter(|class| seen.insert(class.src.as_str()))
            .collect()
    }

    fn record(&self, src: &str) -> Option<&FileRecord> {
        let record = self.files.get(src);
        if record.is_none() {
            tracing::debug!(src, "class points at a file missing from the file map");
        }
        record
    }
}

impl ClassResolver for ClassRegistry {
    fn resolve(&self, class_name: &str) -> Vec<String> {
        self.query_with_overrides(class_name)
            .into_iter()
            .map(|record| record.src.clone())
            .collect()
    }
}
