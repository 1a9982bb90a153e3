//! Directory indexer.
//!
//! Indexing a package happens in a fixed order:
//!
//! 1. every declared sub-package (`<dir>/packages/<name>`)
//! 2. the toolkit subtree (`<dir>/<toolkit>/<toolkit>`), framework packages only
//! 3. the package's classpaths
//! 4. the package's override directories
//!
//! Each recursive build returns its own `PackageIndex`; the caller merges it
//! explicitly. Files inside one directory are analyzed in parallel and folded
//! into the index sequentially in path order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use walkdir::WalkDir;

use super::{NamespaceNode, Package, PackageKind, PackageOptions};
use crate::analysis::{FileAnalyzer, FileRecord};
use crate::error::{Error, Result};

static SOURCE_GLOB: Lazy<GlobMatcher> = Lazy::new(|| {
    Glob::new("**/*.js")
        .expect("source glob is valid")
        .compile_matcher()
});

/// An override relation recorded while indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideLink {
    pub target: String,
    pub src: String,
}

/// The result of indexing one package.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    pub classes: NamespaceNode,
    pub files: BTreeMap<String, FileRecord>,
    /// Every override seen, in processing order.
    pub overrides: Vec<OverrideLink>,
}

impl PackageIndex {
    /// Merge a sub-build into this index.
    ///
    /// Classes and files from `other` win. Its override links are re-applied
    /// against the merged tree so that entries replaced by the merge keep
    /// their overrides.
    pub fn merge(&mut self, other: PackageIndex) {
        self.classes.merge(other.classes);
        self.files.extend(other.files);
        for link in other.overrides {
            self.classes.save_override(&link.target, &link.src);
            self.overrides.push(link);
        }
    }

    /// Fold one analyzed file into the index.
    fn add_file(&mut self, record: FileRecord, path_name: &str) {
        let src = record.src.clone();
        for name in &record.names {
            self.classes.save_class(name, &src);
        }
        self.classes.save_class(path_name, &src);

        if let Some(target) = record.overrides.clone() {
            if !self.classes.save_override(&target, &src) {
                tracing::warn!(
                    file = %src,
                    target = %target,
                    "override target is not registered yet, override dropped"
                );
            }
            self.overrides.push(OverrideLink { target, src: src.clone() });
        }

        self.files.insert(src, record);
    }
}

/// Walks package trees and builds namespace indexes.
#[derive(Debug, Clone)]
pub struct Indexer {
    root: String,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new("Ext")
    }
}

impl Indexer {
    /// Create an indexer for classes registered through `<root>.define`.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Index the package described by `options`.
    pub fn index(&self, options: &PackageOptions) -> Result<PackageIndex> {
        let package = Package::resolve(options)?;
        tracing::debug!(
            dir = %package.dir.display(),
            namespace = %package.namespace,
            kind = %package.kind,
            "indexing package"
        );

        let mut index = PackageIndex::default();

        let sub_builds: Vec<PackageIndex> = package
            .packages
            .par_iter()
            .map(|name| {
                self.index(&sub_package_options(&package, name, options.ignore_overrides))
            })
            .collect::<Result<_>>()?;
        for sub in sub_builds {
            index.merge(sub);
        }

        if package.kind == PackageKind::Framework {
            if let Some(toolkit) = &package.toolkit {
                let options = PackageOptions {
                    kind: Some(PackageKind::Toolkit),
                    toolkit: Some(toolkit.clone()),
                    ignore_overrides: options.ignore_overrides,
                    ..PackageOptions::new(package.dir.join(toolkit).join(toolkit))
                };
                index.merge(self.index(&options)?);
            }
        }

        let analyzer = FileAnalyzer::new(self.root.as_str()).ignore_overrides(package.ignore_overrides);

        for classpath in &package.classpaths {
            self.process_dir(&mut index, &analyzer, classpath, &package.namespace)?;
        }
        let overrides_ns = format!("{}.overrides", package.namespace);
        for dir in &package.overrides {
            self.process_dir(&mut index, &analyzer, dir, &overrides_ns)?;
        }

        tracing::info!(
            dir = %package.dir.display(),
            classes = index.classes.class_count(),
            files = index.files.len(),
            "indexed package"
        );
        Ok(index)
    }

    fn process_dir(
        &self,
        index: &mut PackageIndex,
        analyzer: &FileAnalyzer,
        dir: &Path,
        namespace: &str,
    ) -> Result<()> {
        let files = source_files(dir)?;
        if files.is_empty() {
            return Ok(());
        }

        let records: Vec<FileRecord> = files
            .par_iter()
            .map(|file| analyzer.analyze_file(file))
            .collect::<Result<_>>()?;

        for (file, record) in files.iter().zip(records) {
            index.add_file(record, &path_class_name(namespace, dir, file));
        }
        Ok(())
    }
}

/// Options for `<dir>/packages/<name>`. Sub-packages are never frameworks.
///
/// An explicit `ignore_overrides` setting applies to the whole registry.
fn sub_package_options(
    parent: &Package,
    name: &str,
    ignore_overrides: Option<bool>,
) -> PackageOptions {
    let mut options = PackageOptions::new(parent.dir.join("packages").join(name));
    options.toolkit = parent.toolkit.clone();
    options.ignore_overrides = ignore_overrides;
    if let Ok(sub) = Package::resolve(&options) {
        if sub.kind == PackageKind::Framework {
            options.kind = Some(PackageKind::Code);
        }
    }
    options
}

/// Every `**/*.js` file below `dir`, sorted. A missing directory has none.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if SOURCE_GLOB.is_match(rel) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Class name derived from a file's location: `<namespace>.<dirs>.<stem>`.
pub fn path_class_name(namespace: &str, root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file).with_extension("");
    let mut name = namespace.to_string();
    for part in rel.components() {
        let part = part.as_os_str().to_string_lossy();
        if part.is_empty() || part == "." {
            continue;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&part);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_path_class_name() {
        let root = Path::new("/pkg/src");
        assert_eq!(
            path_class_name("App", root, Path::new("/pkg/src/view/Main.js")),
            "App.view.Main"
        );
        assert_eq!(path_class_name("App", root, Path::new("/pkg/src/Boot.js")), "App.Boot");
        assert_eq!(path_class_name("", root, Path::new("/pkg/src/a/B.js")), "a.B");
    }

    #[test]
    fn test_empty_directory_yields_empty_index() {
        let tmp = TempDir::new().unwrap();
        let index = Indexer::default().index(&PackageOptions::new(tmp.path())).unwrap();
        assert!(index.files.is_empty());
        assert_eq!(index.classes.class_count(), 0);

        let missing = Indexer::default()
            .index(&PackageOptions::new(tmp.path().join("missing")))
            .unwrap();
        assert!(missing.files.is_empty());
    }

    #[test]
    fn test_source_files_only_js() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b/B.js", "");
        write(tmp.path(), "a.js", "");
        write(tmp.path(), "notes.txt", "");
        write(tmp.path(), "c/d.json", "{}");
        let files = source_files(tmp.path()).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(tmp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a.js", "b/B.js"]);
    }

    #[test]
    fn test_declared_and_path_names_are_registered() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "src/view/Main.js",
            "Ext.define('App.view.Main', { alternateClassName: 'MainView' });",
        );
        let options = PackageOptions {
            namespace: Some("App".to_string()),
            ..PackageOptions::new(tmp.path())
        };
        let index = Indexer::default().index(&options).unwrap();

        let src = tmp.path().join("src/view/Main.js").to_string_lossy().to_string();
        assert_eq!(index.files.len(), 1);
        for name in ["App.view.Main", "MainView"] {
            let class = index.classes.get(name).and_then(|n| n.class.as_ref());
            assert_eq!(class.map(|c| c.src.as_str()), Some(src.as_str()), "{}", name);
        }
    }

    #[test]
    fn test_second_override_wins() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/X/Y.js", "Ext.define('X.Y', {});");
        write(tmp.path(), "overrides/a.js", "Ext.define('Patch.A', { override: 'X.Y' });");
        write(tmp.path(), "overrides/b.js", "Ext.define('Patch.B', { override: 'X.Y' });");

        let index = Indexer::default().index(&PackageOptions::new(tmp.path())).unwrap();
        let class = index.classes.get("X.Y").and_then(|n| n.class.as_ref()).unwrap();
        let expected = tmp.path().join("overrides/b.js").to_string_lossy().to_string();
        assert_eq!(class.overridden_by.as_deref(), Some(expected.as_str()));
        assert!(index.classes.get("Ext.overrides.a").is_some());
    }

    #[test]
    fn test_override_before_target_is_dropped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/A.js", "Ext.define('Patch.A', { override: 'X.Y' });");
        write(tmp.path(), "src/B.js", "Ext.define('X.Y', {});");

        let index = Indexer::default().index(&PackageOptions::new(tmp.path())).unwrap();
        let class = index.classes.get("X.Y").and_then(|n| n.class.as_ref()).unwrap();
        assert_eq!(class.overridden_by, None);
        assert_eq!(index.overrides.len(), 1);
    }

    #[test]
    fn test_default_indexer_reads_ext_define() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/Target.js", "Ext.define('X.Y', {});");
        write(tmp.path(), "overrides/Patch.js", "Ext.define('Patch.Y', { override: 'X.Y' });");

        let index = Indexer::default().index(&PackageOptions::new(tmp.path())).unwrap();
        let patch = tmp.path().join("overrides/Patch.js").to_string_lossy().to_string();
        let record = &index.files[&patch];
        assert_eq!(record.names.iter().collect::<Vec<_>>(), vec!["Patch.Y"]);
        assert_eq!(record.override_target(), "X.Y");
        assert_eq!(
            index.overrides,
            vec![OverrideLink {
                target: "X.Y".to_string(),
                src: patch.clone()
            }]
        );
        assert!(index.classes.get("Patch.Y").is_some());
    }

    #[test]
    fn test_ignore_overrides_reaches_sub_packages_and_toolkit() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "package.json",
            r#"{"sencha": {"namespace": "Ext", "type": "framework", "toolkit": "classic"}}"#,
        );
        write(tmp.path(), "src/Base.js", "Ext.define('Ext.Base', {});");
        write(tmp.path(), "classic/classic/src/Panel.js", "Ext.define('Ext.Panel', {});");
        write(
            tmp.path(),
            "classic/classic/overrides/Panel.js",
            "Ext.define('Ext.PanelPatch', { override: 'Ext.Panel' });",
        );
        write(tmp.path(), "packages/charts/src/Chart.js", "Ext.define('Ext.Chart', {});");
        write(
            tmp.path(),
            "packages/charts/overrides/Chart.js",
            "Ext.define('Ext.ChartPatch', { override: 'Ext.Chart' });",
        );

        let mut options = PackageOptions::new(tmp.path());
        options.packages = vec!["charts".to_string()];

        let linked = Indexer::default().index(&options).unwrap();
        assert_eq!(linked.overrides.len(), 2);

        options.ignore_overrides = Some(true);
        let index = Indexer::default().index(&options).unwrap();
        assert!(index.overrides.is_empty(), "got {:?}", index.overrides);
        for name in ["Ext.Panel", "Ext.Chart"] {
            let class = index.classes.get(name).and_then(|n| n.class.as_ref()).unwrap();
            assert_eq!(class.overridden_by, None, "{}", name);
        }
    }

    #[test]
    fn test_parse_failure_aborts_index() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/Ok.js", "Ext.define('A.Ok', {});");
        write(tmp.path(), "src/Bad.js", "Ext.define('A.Bad', {");
        let result = Indexer::default().index(&PackageOptions::new(tmp.path()));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
