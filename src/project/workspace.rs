//! Workspace classification.
//!
//! At initialization the workspace root is classified into one of two
//! regimes: module mode (one entry per discovered module manifest) or
//! source-path mode (one unit rooted at the workspace, with an import
//! path derived from its position under a source root).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use walkdir::WalkDir;

use super::config::{Config, ModuleMode};

/// The module manifest filename.
pub const MANIFEST: &str = "go.mod";

/// Directories never descended into while scanning the workspace.
pub const EXCLUDED_DIR_NAMES: &[&str] = &[".git", ".svn", ".hg", ".vscode", ".idea", "vendor"];

/// Manifest scan depth limit.
const MAX_SCAN_DEPTH: usize = 8;

/// Canonical import-path depth per hosting site.
fn site_depth(host: &str) -> usize {
    match host {
        "github.com" | "golang.org" => 3,
        "gopkg.in" => 2,
        _ => 1,
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("{} is outside every source-path workspace {gopaths:?}", root.display())]
    OutOfWorkspace { root: PathBuf, gopaths: Vec<PathBuf> },
    #[error("{} is not a project root: import path {import_path:?} is too shallow", root.display())]
    ShallowRoot { root: PathBuf, import_path: String },
}

/// One discovered module.
#[derive(Debug, Clone)]
pub struct Module {
    /// Directory containing the manifest.
    pub root_dir: PathBuf,
    /// Module path declared by the manifest, empty if unparsable.
    pub main_path: Arc<str>,
}

/// The classified workspace.
#[derive(Debug, Clone)]
pub enum Workspace {
    /// Module mode: one entry per manifest, sorted in *reverse*
    /// lexicographic root order so deeper modules shadow enclosing ones
    /// on lookup.
    Modules(Vec<Module>),
    /// Source-path mode: one unit rooted at the workspace.
    SourcePath {
        root: PathBuf,
        /// Empty when rooted inside the toolchain tree.
        import_path: Arc<str>,
        under_goroot: bool,
    },
}

impl Workspace {
    /// The module owning `path`, by longest-prefix match over module
    /// roots. Relies on the reverse sort putting deeper roots first.
    pub fn owning_module<'a>(modules: &'a [Module], path: &Path) -> Option<&'a Module> {
        modules.iter().find(|m| path.starts_with(&m.root_dir))
    }

    /// Rank list for cache walks: the module main paths.
    pub fn ranks(&self) -> Vec<Arc<str>> {
        match self {
            Workspace::Modules(modules) => modules
                .iter()
                .filter(|m| !m.main_path.is_empty() && m.main_path.as_ref() != ".")
                .map(|m| m.main_path.clone())
                .collect(),
            Workspace::SourcePath { .. } => Vec::new(),
        }
    }
}

/// Classify the workspace root.
pub fn classify(root: &Path, config: &Config) -> Result<Workspace, ClassifyError> {
    if config.module_mode == ModuleMode::On {
        return Ok(Workspace::Modules(find_modules(root)));
    }

    if config.is_under_goroot(root) {
        return Ok(Workspace::SourcePath {
            root: root.to_path_buf(),
            import_path: goroot_import_path(root, config),
            under_goroot: true,
        });
    }

    let import_path = derive_import_path(root, config);

    if matches!(config.module_mode, ModuleMode::Auto) && import_path.is_none() {
        return Ok(Workspace::Modules(find_modules(root)));
    }

    let Some(import_path) = import_path else {
        return Err(ClassifyError::OutOfWorkspace {
            root: root.to_path_buf(),
            gopaths: config.gopaths.clone(),
        });
    };

    let dirs: Vec<&str> = import_path.split('/').collect();
    let needed = site_depth(dirs[0]);
    if dirs.len() < needed {
        return Err(ClassifyError::ShallowRoot {
            root: root.to_path_buf(),
            import_path: import_path.to_string(),
        });
    }

    Ok(Workspace::SourcePath {
        root: root.to_path_buf(),
        import_path: Arc::from(import_path.as_str()),
        under_goroot: false,
    })
}

/// Derive an import path by stripping a source-path prefix. `None` if
/// the root is outside every source root or is the bare source root.
fn derive_import_path(root: &Path, config: &Config) -> Option<String> {
    for gopath in &config.gopaths {
        let src = gopath.join("src");
        if let Ok(rel) = root.strip_prefix(&src) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.is_empty() {
                return Some(rel);
            }
        }
    }
    None
}

fn goroot_import_path(root: &Path, config: &Config) -> Arc<str> {
    let rel = root
        .strip_prefix(config.goroot_src())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    Arc::from(rel.as_str())
}

/// Walk the root (bounded depth, skipping hidden/VCS/vendor directories)
/// collecting module manifests, then sort reverse-lexicographically.
pub fn find_modules(root: &Path) -> Vec<Module> {
    let mut modules: Vec<Module> = WalkDir::new(root)
        .max_depth(MAX_SCAN_DEPTH)
        .into_iter()
        .filter_entry(|e| {
            !e.file_type().is_dir()
                || !EXCLUDED_DIR_NAMES
                    .iter()
                    .any(|x| e.file_name().to_string_lossy().as_ref() == *x)
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST)
        .map(|e| {
            let root_dir = e.path().parent().unwrap_or(root).to_path_buf();
            let main_path = parse_manifest_module(e.path()).unwrap_or_default();
            Module {
                root_dir,
                main_path: Arc::from(main_path.as_str()),
            }
        })
        .collect();

    modules.sort_by(|a, b| b.root_dir.cmp(&a.root_dir));
    modules
}

/// The `module <path>` line of a manifest.
fn parse_manifest_module(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("module ") {
            return Some(rest.trim().trim_matches('"').to_string());
        }
    }
    None
}
