//! Configuration file schema for extdeps.
//!
//! A configuration names the package trees to index (`registries`) and the
//! prefix table used to turn class names into files (`paths`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::namespace::{Indexer, Package, PackageKind, PackageOptions};
use crate::registry::{ClassRegistry, ContentCache, RegistryStore, SnapshotCache};
use crate::rewrite::{Loader, PathMap, PathPolicy, Rewriter};

/// Starter configuration written by `extdeps init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Application namespace; prefixes bare store and controller names.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Framework root class (`Ext.define`, `Ext.safeCreate`).
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default)]
    pub debug: bool,
    /// Directory for snapshots and rewritten output. Defaults to the
    /// per-user cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Registry whose file map seeds each file's dependencies.
    #[serde(default)]
    pub dependencies_from: Option<String>,
    #[serde(default)]
    pub registries: IndexMap<String, RegistryConfig>,
    /// Prefix table, in resolution order.
    #[serde(default)]
    pub paths: IndexMap<String, PathEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            root: default_root(),
            debug: false,
            cache_dir: None,
            dependencies_from: None,
            registries: IndexMap::new(),
            paths: IndexMap::new(),
        }
    }
}

/// One indexed package tree.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub toolkit: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub kind: Option<PackageKind>,
    #[serde(default)]
    pub classpath: Vec<String>,
    /// Snapshot key. Defaults to the package descriptor's version.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ignore_overrides: Option<bool>,
}

/// A `paths` entry: `false`, a directory template, or `{ registry: name }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathEntry {
    Flag(bool),
    Template(String),
    Registry { registry: String },
}

fn default_namespace() -> String {
    "App".to_string()
}

fn default_root() -> String {
    "Ext".to_string()
}

impl Config {
    /// Parse a configuration from a YAML file. Relative paths are taken
    /// relative to the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config = Self::from_yaml(&content)?;
        let base = path.parent().unwrap_or(Path::new(""));
        config.rebase(base);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    fn rebase(&mut self, base: &Path) {
        for registry in self.registries.values_mut() {
            let joined = base.join(&registry.path);
            registry.path = fs::canonicalize(&joined).unwrap_or(joined);
        }
        if let Some(dir) = &self.cache_dir {
            self.cache_dir = Some(base.join(dir));
        }
    }

    pub fn registry(&self, name: &str) -> Result<&RegistryConfig> {
        self.registries
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown registry: {}", name)))
    }

    /// Package options for the registry `name`.
    pub fn package_options(&self, name: &str) -> Result<PackageOptions> {
        let registry = self.registry(name)?;
        Ok(PackageOptions {
            path: registry.path.clone(),
            namespace: registry.namespace.clone(),
            kind: registry.kind,
            toolkit: registry.toolkit.clone(),
            packages: registry.packages.clone(),
            classpath: registry.classpath.clone(),
            version: registry.version.clone(),
            ignore_overrides: registry.ignore_overrides,
        })
    }

    pub fn snapshot_cache(&self) -> SnapshotCache {
        SnapshotCache::new(self.cache_dir.as_ref().map(|d| d.join("snapshots")))
    }

    pub fn content_cache(&self) -> ContentCache {
        ContentCache::new(self.cache_dir.as_ref().map(|d| d.join("content")))
    }

    /// The versioned store for registry `name`. The snapshot key is
    /// `<name>-<version>`.
    pub fn store(&self, name: &str) -> Result<RegistryStore> {
        let options = self.package_options(name)?;
        let version = match &options.version {
            Some(v) => v.clone(),
            None => Package::resolve(&options)?
                .version
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        };
        Ok(RegistryStore::new(
            Indexer::new(self.root.as_str()),
            options,
            format!("{}-{}", name, version),
            self.snapshot_cache(),
        ))
    }

    /// Names of the registries the rewriter needs, in first-use order.
    pub fn used_registries(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let referenced = self.paths.values().filter_map(|entry| match entry {
            PathEntry::Registry { registry } => Some(registry.as_str()),
            _ => None,
        });
        for name in referenced.chain(self.dependencies_from.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Load (or build) every registry the rewriter needs.
    pub fn load_registries(&self, rebuild: bool) -> Result<HashMap<String, Arc<ClassRegistry>>> {
        let mut loaded = HashMap::new();
        for name in self.used_registries() {
            let store = self.store(name)?;
            let registry = if rebuild {
                store.rebuild()?
            } else {
                store.load_or_build()?
            };
            loaded.insert(name.to_string(), Arc::new(registry));
        }
        Ok(loaded)
    }

    /// The prefix table, with registry entries backed by `registries`.
    pub fn path_map(&self, registries: &HashMap<String, Arc<ClassRegistry>>) -> Result<PathMap> {
        let mut map = PathMap::new();
        for (prefix, entry) in &self.paths {
            let policy = match entry {
                PathEntry::Flag(false) => PathPolicy::Disabled,
                PathEntry::Flag(true) => {
                    return Err(Error::Config(format!(
                        "paths.{}: `true` is not a path policy",
                        prefix
                    )))
                }
                PathEntry::Template(template) => PathPolicy::Template(template.clone()),
                PathEntry::Registry { registry } => {
                    let loaded = registries.get(registry).ok_or_else(|| {
                        Error::Config(format!("paths.{}: registry {} is not loaded", prefix, registry))
                    })?;
                    PathPolicy::Resolver(loaded.clone())
                }
            };
            map.insert(prefix, policy)?;
        }
        Ok(map)
    }

    /// Everything besides a file's own text that shapes its rewrite: root,
    /// namespace, the path table, the seeding registry and the snapshot
    /// version of every registry in use.
    pub fn rewrite_scope(&self) -> Result<String> {
        let versions = self
            .used_registries()
            .into_iter()
            .map(|name| Ok(self.store(name)?.version().to_string()))
            .collect::<Result<Vec<String>>>()?;
        let scope = serde_json::json!({
            "root": self.root,
            "namespace": self.namespace,
            "paths": self.paths,
            "dependencies_from": self.dependencies_from,
            "versions": versions,
        });
        Ok(scope.to_string())
    }

    /// A loader wired to this configuration's registries and caches.
    pub fn loader(&self, rebuild: bool) -> Result<Loader> {
        let registries = self.load_registries(rebuild)?;
        let rewriter = Rewriter::new(&self.root, &self.namespace, self.path_map(&registries)?)?;
        let cache = self.content_cache().with_scope(self.rewrite_scope()?);
        let mut loader = Loader::new(rewriter).with_cache(cache);
        if let Some(name) = &self.dependencies_from {
            if let Some(registry) = registries.get(name) {
                loader = loader.with_dependencies(registry.clone());
            }
        }
        Ok(loader)
    }
}

/// Validate a configuration for internal consistency.
pub fn validate(config: &Config) -> Result<()> {
    for (prefix, entry) in &config.paths {
        match entry {
            PathEntry::Flag(true) => {
                return Err(Error::Config(format!(
                    "paths.{}: use false to disable a prefix",
                    prefix
                )))
            }
            PathEntry::Registry { registry } => {
                config.registry(registry)?;
            }
            _ => {}
        }
        regex::Regex::new(&format!("^{}", prefix))
            .map_err(|e| Error::Config(format!("paths.{}: {}", prefix, e)))?;
    }

    if let Some(name) = &config.dependencies_from {
        config.registry(name)?;
    }

    if config.root.is_empty() {
        return Err(Error::Config("root must not be empty".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
namespace: Shop
root: Ext
debug: true
dependencies_from: ext
registries:
  ext:
    path: ./ext
    toolkit: classic
    packages: [charts]
    kind: framework
paths:
  Legacy: false
  Ext: { registry: ext }
  Shop: src/shop/
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.namespace, "Shop");
        assert!(config.debug);
        let ext = config.registry("ext").unwrap();
        assert_eq!(ext.kind, Some(PackageKind::Framework));
        assert_eq!(ext.packages, vec!["charts"]);

        let entries: Vec<(&str, &PathEntry)> =
            config.paths.iter().map(|(k, v)| (k.as_str(), v)).collect();
        assert_eq!(
            entries,
            vec![
                ("Legacy", &PathEntry::Flag(false)),
                ("Ext", &PathEntry::Registry { registry: "ext".to_string() }),
                ("Shop", &PathEntry::Template("src/shop/".to_string())),
            ]
        );
        assert!(validate(&config).is_ok());
        assert_eq!(config.used_registries(), vec!["ext"]);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.namespace, "App");
        assert_eq!(config.root, "Ext");
        assert!(!config.debug);
        assert!(config.paths.is_empty());
    }

    #[test]
    fn test_unknown_registry_is_rejected() {
        let config = Config::from_yaml("paths:\n  Ext: { registry: nope }\n").unwrap();
        assert!(matches!(validate(&config), Err(Error::Config(_))));

        let config = Config::from_yaml("dependencies_from: nope\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_true_path_entry_is_rejected() {
        let config = Config::from_yaml("paths:\n  Ext: true\n").unwrap();
        assert!(validate(&config).is_err());
        assert!(config.path_map(&HashMap::new()).is_err());
    }

    #[test]
    fn test_template_parses() {
        let config = Config::from_yaml(DEFAULT_TEMPLATE).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rewrite_scope_tracks_path_table() {
        let a = Config::from_yaml("paths:\n  App: src/app\n").unwrap();
        let b = Config::from_yaml("paths:\n  App: lib/app\n").unwrap();
        assert_eq!(a.rewrite_scope().unwrap(), a.clone().rewrite_scope().unwrap());
        assert_ne!(a.rewrite_scope().unwrap(), b.rewrite_scope().unwrap());

        let c = Config::from_yaml("root: Sencha\npaths:\n  App: src/app\n").unwrap();
        assert_ne!(a.rewrite_scope().unwrap(), c.rewrite_scope().unwrap());
    }

    #[test]
    fn test_path_map_from_config() {
        let config = Config::from_yaml("paths:\n  App: src/app\n  Ext: false\n").unwrap();
        let map = config.path_map(&HashMap::new()).unwrap();
        assert_eq!(map.resolve_class_file("App.view.Main"), vec!["src/app/view/Main.js"]);
        assert!(map.resolve_class_file("Ext.Panel").is_empty());
    }
}
