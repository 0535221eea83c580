//! The view: the process-wide snapshot of workspace analysis state.
//!
//! A `View` owns the package cache, the overlay of unsaved buffers, the
//! type store, and the classifier outputs. It is created at initialize
//! and replaced atomically on full rebuild; individual packages are
//! replaced in place through the cache. [`AnalysisHost`] holds the
//! current view and hands out `Arc` snapshots, so requests stay pure
//! over the view they started with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::base::{uri, FileSet};
use crate::types::{Store, Universe};

use super::builtin;
use super::cache::{CanceledError, PackageCache};
use super::config::Config;
use super::loader;
use super::package::Package;
use super::workspace::{classify, ClassifyError, Workspace};

/// One immutable-by-convention analysis snapshot.
pub struct View {
    pub root: PathBuf,
    pub config: Config,
    pub workspace: Workspace,
    pub fset: Arc<FileSet>,
    pub store: Arc<Store>,
    pub universe: Universe,
    pub cache: PackageCache,
    /// Unsaved buffer contents keyed by canonical file path. The overlay
    /// is authoritative over on-disk contents for the loader.
    overlay: RwLock<FxHashMap<String, Arc<str>>>,
}

impl View {
    pub fn new(root: PathBuf, config: Config) -> Result<Self, ClassifyError> {
        let workspace = classify(&root, &config)?;
        let store = Arc::new(Store::new());
        let universe = Universe::new(&store);
        Ok(Self {
            root,
            config,
            workspace,
            fset: Arc::new(FileSet::new()),
            store,
            universe,
            cache: PackageCache::new(),
            overlay: RwLock::new(FxHashMap::default()),
        })
    }

    // ------------------------------------------------------------------
    // Overlay
    // ------------------------------------------------------------------

    pub fn set_overlay(&self, path: &Path, text: impl Into<Arc<str>>) {
        let key = uri::canonical(&path.to_string_lossy());
        self.overlay.write().insert(key, text.into());
    }

    pub fn remove_overlay(&self, path: &Path) {
        let key = uri::canonical(&path.to_string_lossy());
        self.overlay.write().remove(&key);
    }

    pub fn overlay_contains(&self, path: &Path) -> bool {
        let key = uri::canonical(&path.to_string_lossy());
        self.overlay.read().contains_key(&key)
    }

    pub(crate) fn overlay_snapshot(&self) -> FxHashMap<String, Arc<str>> {
        self.overlay.read().clone()
    }

    pub(crate) fn restore_overlay(&self, snapshot: FxHashMap<String, Arc<str>>) {
        *self.overlay.write() = snapshot;
    }

    /// File contents as the loader should see them: overlay first.
    pub fn file_text(&self, path: &Path) -> std::io::Result<Arc<str>> {
        let key = uri::canonical(&path.to_string_lossy());
        if let Some(text) = self.overlay.read().get(&key) {
            return Ok(text.clone());
        }
        std::fs::read_to_string(path).map(Arc::from)
    }

    // ------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------

    /// Whether a file lies inside the workspace root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root) || self.config.is_under_goroot(path)
    }

    pub fn builtin_package(&self) -> Option<Arc<Package>> {
        self.cache.get(super::package::BUILTIN_PKG)
    }

    /// The package owning a file, loading its directory on demand.
    pub fn package_for_file(&self, path: &Path) -> Result<Arc<Package>, loader::LoadError> {
        if let Some(pkg) = self.cache.get_by_file(&path.to_string_lossy()) {
            return Ok(pkg);
        }
        let dir = path.parent().ok_or_else(|| loader::LoadError::NotFound {
            path: path.display().to_string(),
        })?;
        let import = self
            .import_for_dir(dir)
            .ok_or_else(|| loader::LoadError::NotFound {
                path: path.display().to_string(),
            })?;
        let mut stack = Vec::new();
        let pkgs = loader::load_dir(self, dir, &import, true, &mut stack)?;
        for pkg in &pkgs {
            self.cache.put(pkg);
        }
        match self.cache.get_by_file(&path.to_string_lossy()) {
            Some(pkg) => Ok(pkg),
            None => pkgs
                .into_iter()
                .next()
                .ok_or_else(|| loader::LoadError::NotFound {
                    path: path.display().to_string(),
                }),
        }
    }

    /// Derive the import path of a directory from the classifier outputs.
    pub fn import_for_dir(&self, dir: &Path) -> Option<String> {
        let goroot_src = self.config.goroot_src();
        if let Ok(rel) = dir.strip_prefix(&goroot_src) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
        match &self.workspace {
            Workspace::Modules(modules) => {
                let module = Workspace::owning_module(modules, dir)?;
                let rel = dir
                    .strip_prefix(&module.root_dir)
                    .ok()?
                    .to_string_lossy()
                    .replace('\\', "/");
                Some(if rel.is_empty() {
                    module.main_path.to_string()
                } else if module.main_path.is_empty() {
                    rel
                } else {
                    format!("{}/{}", module.main_path, rel)
                })
            }
            Workspace::SourcePath { .. } => {
                for gopath in &self.config.gopaths {
                    if let Ok(rel) = dir.strip_prefix(gopath.join("src")) {
                        let rel = rel.to_string_lossy().replace('\\', "/");
                        if !rel.is_empty() {
                            return Some(rel);
                        }
                    }
                    // Module-cache dependencies resolved on demand.
                    if let Ok(rel) = dir.strip_prefix(gopath.join("pkg").join("mod")) {
                        let rel = rel.to_string_lossy().replace('\\', "/");
                        if !rel.is_empty() {
                            return Some(rel);
                        }
                    }
                }
                None
            }
        }
    }

    /// Iterate cached packages in deterministic rank order.
    pub fn search<F>(&self, f: F) -> Result<(), CanceledError>
    where
        F: FnMut(&Arc<Package>) -> Result<(), CanceledError>,
    {
        self.cache.walk(f, &self.workspace.ranks())
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Re-analyze the unit owning `path`: its module in module mode, the
    /// whole source-path tree otherwise. Replacement packages are
    /// published atomically through the cache.
    pub fn rebuild_for_path(&self, path: &Path) {
        match &self.workspace {
            Workspace::Modules(modules) => {
                let Some(module) = Workspace::owning_module(modules, path) else {
                    return;
                };
                info!("rebuilding module {}", module.main_path);
                if !module.main_path.is_empty() {
                    self.cache.remove_path_prefix(&module.main_path);
                }
                if let Err(err) = loader::load_tree(self, &module.root_dir, &module.main_path)
                {
                    warn!("rebuild {}: {}", module.main_path, err);
                }
            }
            Workspace::SourcePath {
                root, import_path, ..
            } => {
                info!("rebuilding source-path unit {}", import_path);
                self.cache.remove_path_prefix(import_path);
                if let Err(err) = loader::load_tree(self, root, import_path) {
                    warn!("rebuild {}: {}", import_path, err);
                }
            }
        }
    }
}

/// Owns the current view and swaps it atomically on full rebuild.
pub struct AnalysisHost {
    view: RwLock<Arc<View>>,
}

impl AnalysisHost {
    pub fn new(root: PathBuf, config: Config) -> Result<Self, ClassifyError> {
        let view = Arc::new(View::new(root, config)?);
        Ok(Self {
            view: RwLock::new(view),
        })
    }

    /// The current snapshot. Requests hold it for their whole lifetime.
    pub fn snapshot(&self) -> Arc<View> {
        self.view.read().clone()
    }

    /// Load the builtin namespace and the workspace packages. With
    /// warmup enabled, the workspace load happens on a background
    /// thread; requests arriving meanwhile load packages on demand.
    pub fn initialize(&self) {
        let view = self.snapshot();
        builtin::load_builtin(&view);
        if view.config.warmup_on_initialize {
            let bg = view.clone();
            std::thread::spawn(move || {
                if let Err(err) = loader::load_workspace(&bg) {
                    warn!("warmup: {}", err);
                }
            });
        } else if let Err(err) = loader::load_workspace(&view) {
            warn!("load workspace: {}", err);
        }
    }

    /// Replace the whole view, carrying the overlay over.
    pub fn rebuild(&self) -> Result<(), ClassifyError> {
        let old = self.snapshot();
        let fresh = Arc::new(View::new(old.root.clone(), old.config.clone())?);
        fresh.restore_overlay(old.overlay_snapshot());
        *self.view.write() = fresh;
        self.initialize();
        Ok(())
    }
}
