//! # Module Loader
//!
//! Discovers orb modules by walking a directory tree.
//!
//! A module is described on disk by an *orb manifest*, any file whose name ends in
//! `.orb.toml`. A manifest carries zero or more `[[orb]]` tables:
//!
//! ```toml
//! [[orb]]
//! name = "greeter"
//! type = "service"
//! factory = "sample::greeter"
//! dependencies = ["zenith:config", { all = "greeting" }]
//! ```
//!
//! The `factory` key is looked up in a [`FactoryCatalog`], which maps keys to Rust
//! constructors. Factories get into the catalog either explicitly
//! ([`FactoryCatalog::register`]) or at link time through the [`ORB_FACTORIES`]
//! distributed slice:
//!
//! ```rust,ignore
//! #[linkme::distributed_slice(zenith_core::ORB_FACTORIES)]
//! static GREETER: FactoryEntry = FactoryEntry {
//!     key: "sample::greeter",
//!     factory: build_greeter,
//! };
//! ```
//!
//! Other files are ignored. A manifest that cannot be read or parsed, or that names
//! an unknown factory, fails the whole scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linkme::distributed_slice;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BoxError, Result, ZenithError};
use crate::orb::{Dependency, Injected, OrbDescriptor, OrbFactory, OrbValue};

/// Suffix identifying orb manifest files.
pub const MANIFEST_SUFFIX: &str = ".orb.toml";

/// Factory registered at link time.
pub struct FactoryEntry {
    pub key: &'static str,
    pub factory: fn(&Injected) -> Result<OrbValue, BoxError>,
}

/// Every [`FactoryEntry`] linked into the binary.
#[distributed_slice]
pub static ORB_FACTORIES: [FactoryEntry] = [..];

/// Registration metadata for one module: name, type tag and ordered dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbMetadata {
    pub name: String,
    pub orb_type: Option<String>,
    pub dependencies: Vec<Dependency>,
}

/// A discovered module: metadata plus the factory it resolved to.
#[derive(Clone)]
pub struct Module {
    pub metadata: OrbMetadata,
    pub factory_key: String,
    pub factory: OrbFactory,
    /// Manifest the module was read from.
    pub source: PathBuf,
}

impl Module {
    pub fn into_descriptor(self) -> OrbDescriptor {
        OrbDescriptor {
            name: self.metadata.name,
            orb_type: self.metadata.orb_type,
            dependencies: self.metadata.dependencies,
            factory_key: self.factory_key,
            factory: self.factory,
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("metadata", &self.metadata)
            .field("factory_key", &self.factory_key)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Modules returned by one scan, in traversal order.
pub type ModuleSet = Vec<Module>;

/// Maps factory keys to constructors.
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, OrbFactory>,
}

impl FactoryCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog seeded with every entry of [`ORB_FACTORIES`].
    pub fn linked() -> Self {
        let mut catalog = Self::new();
        for entry in ORB_FACTORIES {
            let factory = entry.factory;
            catalog
                .factories
                .insert(entry.key.to_string(), Arc::new(move |deps: &Injected| factory(deps)));
        }
        catalog
    }

    /// Adds or replaces a factory.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&Injected) -> Result<OrbValue, BoxError> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
    }

    pub fn get(&self, key: &str) -> Option<OrbFactory> {
        self.factories.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "orb")]
    orbs: Vec<OrbManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrbManifest {
    name: String,
    #[serde(default, rename = "type")]
    orb_type: Option<String>,
    factory: String,
    #[serde(default)]
    dependencies: Vec<DependencyManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencyManifest {
    One(String),
    All { all: String },
}

impl From<DependencyManifest> for Dependency {
    fn from(manifest: DependencyManifest) -> Self {
        match manifest {
            DependencyManifest::One(reference) => Dependency::One(reference),
            DependencyManifest::All { all } => Dependency::All(all),
        }
    }
}

/// Walks module roots and turns orb manifests into [`Module`]s.
#[derive(Clone, Default)]
pub struct ModuleLoader {
    catalog: FactoryCatalog,
}

impl ModuleLoader {
    /// A loader whose catalog holds every linked factory.
    pub fn new() -> Self {
        Self::with_catalog(FactoryCatalog::linked())
    }

    pub fn with_catalog(catalog: FactoryCatalog) -> Self {
        Self { catalog }
    }

    pub fn register_factory<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&Injected) -> Result<OrbValue, BoxError> + Send + Sync + 'static,
    {
        self.catalog.register(key, factory);
    }

    pub fn catalog(&self) -> &FactoryCatalog {
        &self.catalog
    }

    /// Scans `root` recursively. The walk runs on the blocking pool.
    pub async fn scan(&self, root: impl AsRef<Path>) -> Result<ModuleSet> {
        let root = root.as_ref().to_path_buf();
        let catalog = self.catalog.clone();
        let walk_root = root.clone();
        let modules = tokio::task::spawn_blocking(move || scan_tree(&walk_root, &catalog))
            .await
            .map_err(|e| ZenithError::discovery(&root, e))??;
        info!(root = %root.display(), modules = modules.len(), "Scanned module root");
        Ok(modules)
    }
}

/// Synchronous scan, shared by [`ModuleLoader::scan`] and tests.
pub fn scan_tree(root: &Path, catalog: &FactoryCatalog) -> Result<ModuleSet> {
    if !root.exists() {
        return Err(ZenithError::discovery(root, "directory does not exist"));
    }
    if !root.is_dir() {
        return Err(ZenithError::discovery(root, "not a directory"));
    }

    let mut modules = ModuleSet::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            ZenithError::discovery(path, e)
        })?;
        if !entry.file_type().is_file() || !is_manifest(entry.path()) {
            continue;
        }
        modules.extend(load_manifest(entry.path(), catalog)?);
    }
    Ok(modules)
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(MANIFEST_SUFFIX))
}

fn load_manifest(path: &Path, catalog: &FactoryCatalog) -> Result<Vec<Module>> {
    let content = std::fs::read_to_string(path).map_err(|e| ZenithError::discovery(path, e))?;
    let manifest: Manifest =
        toml::from_str(&content).map_err(|e| ZenithError::discovery(path, e))?;
    debug!(manifest = %path.display(), orbs = manifest.orbs.len(), "Loaded orb manifest");

    manifest
        .orbs
        .into_iter()
        .map(|orb| {
            if orb.name.trim().is_empty() {
                return Err(ZenithError::discovery(path, "orb name must not be empty"));
            }
            let factory = catalog.get(&orb.factory).ok_or_else(|| {
                ZenithError::discovery(
                    path,
                    format!("unknown factory '{}' for orb '{}'", orb.factory, orb.name),
                )
            })?;
            Ok(Module {
                metadata: OrbMetadata {
                    name: orb.name,
                    orb_type: orb.orb_type,
                    dependencies: orb.dependencies.into_iter().map(Dependency::from).collect(),
                },
                factory_key: orb.factory,
                factory,
                source: path.to_path_buf(),
            })
        })
        .collect()
}
