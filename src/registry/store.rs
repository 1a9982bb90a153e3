use super::{ClassRegistry, SnapshotCache};
use crate::error::Result;
use crate::namespace::{Indexer, PackageOptions};

/// Builds a package's registry once per version and restores it afterwards.
///
/// Two processes building the same version concurrently both index and the
/// last snapshot written wins.
pub struct RegistryStore {
    indexer: Indexer,
    options: PackageOptions,
    version: String,
    cache: SnapshotCache,
}

impl RegistryStore {
    pub fn new(
        indexer: Indexer,
        options: PackageOptions,
        version: impl Into<String>,
        cache: SnapshotCache,
    ) -> Self {
        Self {
            indexer,
            options,
            version: version.into(),
            cache,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn options(&self) -> &PackageOptions {
        &self.options
    }

    /// Restore the snapshot for this version, indexing on a miss.
    pub fn load_or_build(&self) -> Result<ClassRegistry> {
        if let Some(registry) = self.cache.load(&self.version) {
            tracing::debug!(version = %self.version, "registry snapshot hit");
            return Ok(registry);
        }
        tracing::debug!(version = %self.version, "registry snapshot miss");
        self.rebuild()
    }

    /// Index the package and overwrite the snapshot for this version.
    pub fn rebuild(&self) -> Result<ClassRegistry> {
        let registry = ClassRegistry::from(self.indexer.index(&self.options)?);
        self.cache.store(&self.version, &registry)?;
        tracing::info!(
            version = %self.version,
            classes = registry.class_count(),
            files = registry.file_count(),
            "registry snapshot written"
        );
        Ok(registry)
    }
}
