//! Per-file entry point for build pipelines.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::Rewriter;
use crate::error::{Error, Result};
use crate::registry::{ClassRegistry, ContentCache};

/// Rewrites files, seeding each with the dependencies recorded for it in a
/// class registry and memoizing output by content.
pub struct Loader {
    rewriter: Rewriter,
    registry: Option<Arc<ClassRegistry>>,
    cache: Option<ContentCache>,
}

impl Loader {
    pub fn new(rewriter: Rewriter) -> Self {
        Self {
            rewriter,
            registry: None,
            cache: None,
        }
    }

    /// Seed files from the file map of `registry`.
    pub fn with_dependencies(mut self, registry: Arc<ClassRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// Files `src` depends on according to the seeding registry: the files
    /// of every class it requires, then the files of the class it overrides.
    /// Each class pulls in its own override too, unless that override is
    /// `src` itself.
    pub fn dependencies(&self, src: &str) -> (Vec<String>, Vec<String>) {
        let Some(registry) = &self.registry else {
            return (Vec::new(), Vec::new());
        };
        let Some(record) = registry.file(src) else {
            return (Vec::new(), Vec::new());
        };

        let resolve = |name: &str| -> Vec<String> {
            registry
                .query_with_overrides(name)
                .into_iter()
                .filter(|r| r.src != src)
                .map(|r| r.src.clone())
                .collect()
        };
        let requires = record.requires.iter().flat_map(|name| resolve(name.as_str())).collect();
        let overrides = match &record.overrides {
            Some(target) => resolve(target.as_str()),
            None => Vec::new(),
        };
        (requires, overrides)
    }

    /// Rewrite one file. Cached output for identical input is returned as is.
    pub fn process(&self, src: &str, source: &str) -> Result<String> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(src, source) {
                tracing::debug!(file = src, "content cache hit");
                return Ok(hit);
            }
        }

        let (requires, overrides) = self.dependencies(src);
        let output = self
            .rewriter
            .rewrite(src, source, &requires, &overrides)
            .map_err(|e| {
                tracing::error!(file = src, error = %e, "rewrite failed");
                e
            })?;

        if let Some(cache) = &self.cache {
            cache.set(src, source, &output);
        }
        Ok(output)
    }

    /// Read and rewrite a file from disk.
    pub fn process_file(&self, path: &std::path::Path) -> Result<String> {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.process(&path.to_string_lossy(), &source)
    }

    /// Rewrite many files concurrently. Results come back in input order;
    /// one file failing does not stop the others.
    pub async fn process_all(
        self: Arc<Self>,
        paths: Vec<PathBuf>,
        concurrency: usize,
    ) -> Vec<(PathBuf, Result<String>)> {
        use futures::stream::{self, StreamExt};

        let mut results: Vec<(usize, PathBuf, Result<String>)> = stream::iter(paths.into_iter().enumerate())
            .map(|(i, path)| {
                let loader = Arc::clone(&self);
                async move {
                    let task_path = path.clone();
                    let result = tokio::task::spawn_blocking(move || loader.process_file(&task_path))
                        .await
                        .unwrap_or_else(|e| {
                            Err(Error::io(
                                &path,
                                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                            ))
                        });
                    (i, path, result)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(i, _, _)| *i);
        results.into_iter().map(|(_, path, result)| (path, result)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FileRecord;
    use crate::rewrite::{PathMap, PathPolicy};

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        for (src, name) in [("ext/Panel.js", "Ext.Panel"), ("ext/Base.js", "Ext.Base")] {
            let mut record = FileRecord::new(src);
            record.add_name(name);
            registry.classes.save_class(name, src);
            registry.files.insert(src.to_string(), record);
        }

        let mut patch = FileRecord::new("ext/PanelPatch.js");
        patch.set_override("Ext.Panel");
        registry.classes.save_override("Ext.Panel", "ext/PanelPatch.js");
        registry.files.insert(patch.src.clone(), patch);

        let mut main = FileRecord::new("app/Main.js");
        main.add_require("Ext.Panel");
        main.set_override("Ext.Base");
        registry.files.insert(main.src.clone(), main);
        Arc::new(registry)
    }

    fn loader() -> Loader {
        let rewriter = Rewriter::new("Ext", "App", PathMap::new()).unwrap();
        Loader::new(rewriter).with_dependencies(registry())
    }

    #[test]
    fn test_dependencies_include_overrides() {
        let (requires, overrides) = loader().dependencies("app/Main.js");
        assert_eq!(requires, vec!["ext/Panel.js", "ext/PanelPatch.js"]);
        assert_eq!(overrides, vec!["ext/Base.js"]);

        let (requires, overrides) = loader().dependencies("unknown.js");
        assert!(requires.is_empty() && overrides.is_empty());
    }

    #[test]
    fn test_override_file_does_not_seed_itself() {
        let (requires, overrides) = loader().dependencies("ext/PanelPatch.js");
        assert!(requires.is_empty());
        assert_eq!(overrides, vec!["ext/Panel.js"]);
    }

    #[test]
    fn test_process_seeds_and_caches() {
        let loader = loader().with_cache(ContentCache::in_memory());
        let out = loader.process("app/Main.js", "var a;").unwrap();
        assert_eq!(
            out,
            "require(\"ext/Panel.js\");\nrequire(\"ext/PanelPatch.js\");\nrequire(\"ext/Base.js\");\nvar a;"
        );
        assert_eq!(loader.process("app/Main.js", "var a;").unwrap(), out);
    }

    #[test]
    fn test_cache_hit_skips_rewrite() {
        let cache = ContentCache::in_memory();
        cache.set("broken.js", "Ext.define(", "cached");
        let loader = loader().with_cache(cache);
        assert_eq!(loader.process("broken.js", "Ext.define(").unwrap(), "cached");
    }

    #[test]
    fn test_process_all_keeps_order_and_failures() {
        let tmp = tempfile::TempDir::new().unwrap();
        let good = tmp.path().join("good.js");
        let bad = tmp.path().join("bad.js");
        std::fs::write(&good, "var a = 1;").unwrap();
        std::fs::write(&bad, "var a = ;").unwrap();

        let loader = Arc::new(
            Loader::new(
                Rewriter::new(
                    "Ext",
                    "App",
                    PathMap::new().with("App", PathPolicy::Template("src".into())).unwrap(),
                )
                .unwrap(),
            ),
        );
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let results = runtime.block_on(loader.process_all(
            vec![good.clone(), bad.clone(), tmp.path().join("missing.js")],
            4,
        ));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, good);
        assert_eq!(results[0].1.as_ref().unwrap(), "var a = 1;");
        assert!(matches!(results[1].1, Err(Error::Parse { .. })));
        assert!(matches!(results[2].1, Err(Error::Io { .. })));
    }
}
