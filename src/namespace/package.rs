//! Package descriptors and resolved package layouts.
//!
//! A package root may carry a `package.json`. Its `sencha` object (or the
//! whole document when there is no such key) describes the package:
//!
//! ```json
//! {
//!   "sencha": {
//!     "namespace": "Ext",
//!     "type": "framework",
//!     "toolkit": "classic",
//!     "version": "7.0.0",
//!     "classpath": ["${package.dir}/src"],
//!     "overrides": ["${package.dir}/overrides"]
//!   }
//! }
//! ```
//!
//! Explicit `PackageOptions` always win over the descriptor.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DESCRIPTOR_FILE: &str = "package.json";
const DEFAULT_NAMESPACE: &str = "Ext";

/// The kind of a package, which decides how it is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Indexes its toolkit subtree before its own sources.
    Framework,
    Toolkit,
    Theme,
    #[default]
    #[serde(other)]
    Code,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Framework => "framework",
            PackageKind::Toolkit => "toolkit",
            PackageKind::Code => "code",
            PackageKind::Theme => "theme",
        }
    }
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One path or a list of paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    One(String),
    Many(Vec<String>),
}

impl PathList {
    fn into_vec(self) -> Vec<String> {
        match self {
            PathList::One(p) => vec![p],
            PathList::Many(ps) => ps,
        }
    }
}

/// The package section of a `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<PackageKind>,
    #[serde(default)]
    pub toolkit: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub classpath: Option<PathList>,
    #[serde(default)]
    pub overrides: Option<PathList>,
}

impl PackageDescriptor {
    /// Load the descriptor of the package rooted at `dir`.
    ///
    /// A missing `package.json` yields an empty descriptor.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("invalid package descriptor {}: {}", path.display(), e)))
    }

    /// Parse descriptor JSON, preferring the `sencha` section.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(content)?;
        let section = match value.get_mut("sencha") {
            Some(sencha) => sencha.take(),
            None => value,
        };
        serde_json::from_value(section)
    }
}

/// Caller-provided package settings. Unset fields fall back to the descriptor.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Package root directory.
    pub path: PathBuf,
    pub namespace: Option<String>,
    pub kind: Option<PackageKind>,
    pub toolkit: Option<String>,
    /// Sub-packages under `<path>/packages/`, indexed in this order.
    pub packages: Vec<String>,
    pub classpath: Vec<String>,
    pub version: Option<String>,
    pub ignore_overrides: Option<bool>,
}

impl PackageOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A package with every setting resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub dir: PathBuf,
    pub namespace: String,
    pub kind: PackageKind,
    pub toolkit: Option<String>,
    pub version: Option<String>,
    pub packages: Vec<String>,
    /// Source roots; path-derived class names are relative to these.
    pub classpaths: Vec<PathBuf>,
    pub overrides: Vec<PathBuf>,
    pub ignore_overrides: bool,
}

impl Package {
    /// Resolve `options` against the package descriptor found on disk.
    pub fn resolve(options: &PackageOptions) -> Result<Self> {
        let descriptor = PackageDescriptor::load(&options.path)?;
        Ok(Self::from_parts(options, descriptor))
    }

    pub fn from_parts(options: &PackageOptions, descriptor: PackageDescriptor) -> Self {
        let dir = options.path.clone();
        let namespace = options
            .namespace
            .clone()
            .or(descriptor.namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let kind = options.kind.or(descriptor.kind).unwrap_or_default();
        let toolkit = options.toolkit.clone().or(descriptor.toolkit);
        let version = options.version.clone().or(descriptor.version);

        let substitute = |raw: &str| -> PathBuf {
            let expanded = raw
                .replace("${package.dir}", &dir.to_string_lossy())
                .replace("${toolkit.name}", toolkit.as_deref().unwrap_or(""));
            let path = PathBuf::from(expanded);
            if path.is_absolute() {
                path
            } else {
                dir.join(path)
            }
        };

        let classpaths: Vec<PathBuf> = if !options.classpath.is_empty() {
            options.classpath.iter().map(|p| substitute(p)).collect()
        } else if let Some(list) = descriptor.classpath {
            list.into_vec().iter().map(|p| substitute(p)).collect()
        } else {
            vec![default_classpath(&dir)]
        };

        let overrides = match descriptor.overrides {
            Some(list) => list.into_vec().iter().map(|p| substitute(p)).collect(),
            None => classpaths
                .first()
                .map(|cp| vec![cp.parent().unwrap_or(cp).join("overrides")])
                .unwrap_or_default(),
        };

        let ignore_overrides = options
            .ignore_overrides
            .unwrap_or_else(|| namespace.eq_ignore_ascii_case("deft"));

        Self {
            dir,
            namespace,
            kind,
            toolkit,
            version,
            packages: options.packages.clone(),
            classpaths,
            overrides,
            ignore_overrides,
        }
    }
}

/// `<dir>/src` when it exists, otherwise the package root itself.
fn default_classpath(dir: &Path) -> PathBuf {
    let src = dir.join("src");
    if src.is_dir() {
        src
    } else {
        dir.to_path_buf()
    }
}
