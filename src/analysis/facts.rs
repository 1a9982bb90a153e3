//! Per-file records extracted by the analyzer.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Everything a single source file declares about its classes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path identity of the file.
    pub src: String,
    /// Distinct class names declared by the file, aliases included.
    #[serde(default)]
    pub names: IndexSet<String>,
    /// Class-name dependencies in declaration order. Duplicates are kept.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Class patched by this file.
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,
}

impl FileRecord {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }

    /// Add a declared name. Empty and already-present names are ignored.
    pub fn add_name(&mut self, name: &str) {
        if !name.is_empty() && !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }

    /// Append a dependency.
    pub fn add_require(&mut self, name: &str) {
        if !name.is_empty() {
            self.requires.push(name.to_string());
        }
    }

    /// Record the overridden class. A later call replaces an earlier one.
    pub fn set_override(&mut self, name: &str) {
        if !name.is_empty() {
            self.overrides = Some(name.to_string());
        }
    }

    /// The overridden class name, empty when the file overrides nothing.
    pub fn override_target(&self) -> &str {
        self.overrides.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_deduplicated_in_order() {
        let mut record = FileRecord::new("a.js");
        record.add_name("App.B");
        record.add_name("App.A");
        record.add_name("App.B");
        record.add_name("");
        let names: Vec<&str> = record.names.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["App.B", "App.A"]);
    }

    #[test]
    fn test_requires_keep_duplicates() {
        let mut record = FileRecord::new("a.js");
        record.add_require("App.A");
        record.add_require("App.A");
        record.add_require("");
        assert_eq!(record.requires, vec!["App.A", "App.A"]);
    }

    #[test]
    fn test_override_last_write_wins() {
        let mut record = FileRecord::new("a.js");
        assert_eq!(record.override_target(), "");
        record.set_override("X.Y");
        record.set_override("X.Z");
        record.set_override("");
        assert_eq!(record.override_target(), "X.Z");
    }

    #[test]
    fn test_serialized_field_names() {
        let mut record = FileRecord::new("a.js");
        record.add_name("App.A");
        record.set_override("Ext.Base");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["override"], "Ext.Base");
        assert_eq!(json["names"][0], "App.A");
    }
}
