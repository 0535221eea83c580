//! Package loading: directory → parsed, type-checked packages.
//!
//! A directory yields up to three sibling packages: the main package, an
//! internal test variant (main files plus same-package test files,
//! re-checked as one unit), and an external test package importing the
//! internal variant. Import subgraphs are loaded recursively with cycle
//! detection and published through the cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::base::FileId;
use crate::syntax::{ast, parse_file};
use crate::types::{check_package, PkgScope};

use super::package::Package;
use super::view::View;
use super::workspace::{Workspace, EXCLUDED_DIR_NAMES};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot find package {path:?}")]
    NotFound { path: String },
    #[error("no source files in {}", dir.display())]
    NoSourceFiles { dir: PathBuf },
    #[error("import cycle through {path:?}")]
    ImportCycle { path: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Failures caused by the directory containing nothing analyzable,
    /// as opposed to real loader breakage.
    pub fn is_empty_package(&self) -> bool {
        matches!(self, LoadError::NoSourceFiles { .. })
    }
}

/// Load every package of the classified workspace into the cache.
pub fn load_workspace(view: &View) -> Result<(), LoadError> {
    match view.workspace.clone() {
        Workspace::SourcePath {
            root, import_path, ..
        } => load_tree(view, &root, &import_path),
        Workspace::Modules(modules) => {
            for module in &modules {
                // A deeper module shadows this one for its subtree; the
                // tree walk below rechecks ownership per directory.
                load_tree(view, &module.root_dir, &module.main_path)?;
            }
            Ok(())
        }
    }
}

/// Load every package directory under `root`, mapping `root` itself to
/// `base_import`.
pub fn load_tree(view: &View, root: &Path, base_import: &str) -> Result<(), LoadError> {
    let dirs = source_dirs(root);
    for dir in dirs {
        if let Workspace::Modules(modules) = &view.workspace {
            // A deeper module shadows this one for its subtree.
            let owner = Workspace::owning_module(modules, &dir);
            if let Some(owner) = owner {
                if owner.root_dir != root {
                    continue;
                }
            }
        }
        let rel = dir
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let import = join_import(base_import, &rel);
        if import.is_empty() {
            continue;
        }
        let mut stack = Vec::new();
        match load_dir(view, &dir, &import, true, &mut stack) {
            Ok(pkgs) => {
                for pkg in &pkgs {
                    view.cache.put(pkg);
                }
            }
            Err(err) if err.is_empty_package() => {}
            Err(err) => warn!("load {}: {}", import, err),
        }
    }
    Ok(())
}

/// Directories under `root` that contain source files, `root` included,
/// hidden/VCS/vendor subtrees excluded.
fn source_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let walker = walkdir::WalkDir::new(root).into_iter().filter_entry(|e| {
        if !e.file_type().is_dir() {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        e.depth() == 0
            || (!name.starts_with('.') && !EXCLUDED_DIR_NAMES.contains(&name.as_ref()))
    });
    for entry in walker.filter_map(Result::ok) {
        if entry.file_type().is_dir() && dir_has_sources(entry.path()) {
            dirs.push(entry.path().to_path_buf());
        }
    }
    dirs.sort();
    dirs
}

fn dir_has_sources(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|e| is_source_file(&e.path()))
        })
        .unwrap_or(false)
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.starts_with('.') && !name.starts_with('_')
}

fn join_import(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rel}"),
    }
}

/// Resolve an import path to a cached package, loading it on demand.
pub fn load_import(
    view: &View,
    path: &str,
    stack: &mut Vec<Arc<str>>,
) -> Result<Arc<Package>, LoadError> {
    if let Some(pkg) = view.cache.get(path) {
        return Ok(pkg);
    }
    if stack.iter().any(|p| p.as_ref() == path) {
        return Err(LoadError::ImportCycle {
            path: path.to_string(),
        });
    }
    let dir = dir_for_import(view, path).ok_or_else(|| LoadError::NotFound {
        path: path.to_string(),
    })?;

    stack.push(Arc::from(path));
    let result = load_dir(view, &dir, path, false, stack);
    stack.pop();

    let pkgs = result?;
    for pkg in &pkgs {
        view.cache.put(pkg);
    }
    pkgs.into_iter().next().ok_or_else(|| LoadError::NotFound {
        path: path.to_string(),
    })
}

/// Locate the directory holding an import path's sources.
pub fn dir_for_import(view: &View, path: &str) -> Option<PathBuf> {
    let goroot_dir = view.config.goroot_src().join(path);
    if goroot_dir.is_dir() {
        return Some(goroot_dir);
    }

    match &view.workspace {
        Workspace::Modules(modules) => {
            for module in modules {
                let main = module.main_path.as_ref();
                if main.is_empty() {
                    continue;
                }
                if path == main {
                    return Some(module.root_dir.clone());
                }
                if let Some(rest) = path.strip_prefix(&format!("{main}/")) {
                    return Some(module.root_dir.join(rest));
                }
            }
            // Module dependencies come from the download cache.
            let cached = view.config.module_cache()?.join(path);
            cached.is_dir().then_some(cached)
        }
        Workspace::SourcePath { .. } => {
            for gopath in &view.config.gopaths {
                let dir = gopath.join("src").join(path);
                if dir.is_dir() {
                    return Some(dir);
                }
            }
            None
        }
    }
}

/// Load the packages of one directory.
pub fn load_dir(
    view: &View,
    dir: &Path,
    import_path: &str,
    with_tests: bool,
    stack: &mut Vec<Arc<str>>,
) -> Result<Vec<Arc<Package>>, LoadError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| is_source_file(p))
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(LoadError::NoSourceFiles {
            dir: dir.to_path_buf(),
        });
    }

    // Parse everything up front; broken files still contribute a tree.
    let mut parsed: Vec<(PathBuf, FileId, ast::File)> = Vec::new();
    for path in paths {
        let text = match view.file_text(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!("read {}: {}", path.display(), err);
                continue;
            }
        };
        let fid = view.fset.file_id(&path);
        view.fset.set_contents(fid, text.clone());
        let (file, errors) = parse_file(fid, &text);
        if !errors.is_empty() {
            debug!("{}: {} parse errors", path.display(), errors.len());
        }
        parsed.push((path, fid, file));
    }
    if parsed.is_empty() {
        return Err(LoadError::NoSourceFiles {
            dir: dir.to_path_buf(),
        });
    }

    let is_test_file = |p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_test.go"))
    };

    let main_files: Vec<&(PathBuf, FileId, ast::File)> =
        parsed.iter().filter(|(p, _, _)| !is_test_file(p)).collect();
    let pkg_name = main_files
        .first()
        .map(|(_, _, f)| f.package.name.clone())
        .or_else(|| parsed.first().map(|(_, _, f)| f.package.name.clone()))
        .map(|name| match name.strip_suffix("_test") {
            // A test-only directory still names the base package.
            Some(base) if main_files.is_empty() => SmolStr::new(base),
            _ => name,
        })
        .unwrap_or_else(|| SmolStr::new("main"));

    let internal_tests: Vec<&(PathBuf, FileId, ast::File)> = parsed
        .iter()
        .filter(|(p, _, f)| is_test_file(p) && f.package.name == pkg_name)
        .collect();
    let external_tests: Vec<&(PathBuf, FileId, ast::File)> = parsed
        .iter()
        .filter(|(p, _, f)| {
            is_test_file(p) && f.package.name.as_str() == format!("{pkg_name}_test")
        })
        .collect();

    let mut out = Vec::new();

    // Main package.
    let main_pkg = if !main_files.is_empty() {
        let pkg = build_package(
            view,
            import_path.into(),
            import_path.into(),
            pkg_name.clone(),
            &main_files,
            None,
            stack,
        )?;
        out.push(pkg.clone());
        Some(pkg)
    } else {
        None
    };

    if with_tests && !internal_tests.is_empty() {
        let mut files: Vec<&(PathBuf, FileId, ast::File)> = main_files.clone();
        files.extend(internal_tests.iter().copied());
        let id: Arc<str> = format!("{import_path} [test]").into();
        let pkg = build_package(
            view,
            id,
            import_path.into(),
            pkg_name.clone(),
            &files,
            None,
            stack,
        )?;
        out.push(pkg);
    }

    if with_tests && !external_tests.is_empty() {
        // The external test package imports the test-augmented variant
        // when one exists, else the plain package.
        let base = out.last().cloned().or(main_pkg);
        let path: Arc<str> = format!("{import_path}_test").into();
        let pkg = build_package(
            view,
            path.clone(),
            path,
            SmolStr::new(format!("{pkg_name}_test")),
            &external_tests,
            base.map(|b| (Arc::from(import_path), b)),
            stack,
        )?;
        out.push(pkg);
    }

    if out.is_empty() {
        return Err(LoadError::NoSourceFiles {
            dir: dir.to_path_buf(),
        });
    }
    Ok(out)
}

/// Check one group of files as a package.
fn build_package(
    view: &View,
    id: Arc<str>,
    path: Arc<str>,
    name: SmolStr,
    files: &[&(PathBuf, FileId, ast::File)],
    extra_import: Option<(Arc<str>, Arc<Package>)>,
    stack: &mut Vec<Arc<str>>,
) -> Result<Arc<Package>, LoadError> {
    let mut imports: FxHashMap<Arc<str>, Arc<Package>> = FxHashMap::default();
    let mut scopes: FxHashMap<Arc<str>, Arc<PkgScope>> = FxHashMap::default();

    if let Some((extra_path, extra_pkg)) = extra_import {
        scopes.insert(extra_path.clone(), extra_pkg.scope.clone());
        imports.insert(extra_path, extra_pkg);
    }

    for (_, _, file) in files {
        for spec in &file.imports {
            let import_path = spec.path.string_value();
            if import_path.is_empty()
                || import_path.as_str() == path.as_ref()
                || imports.contains_key(import_path.as_str())
            {
                continue;
            }
            match load_import(view, &import_path, stack) {
                Ok(pkg) => {
                    let key: Arc<str> = import_path.as_str().into();
                    scopes.insert(key.clone(), pkg.scope.clone());
                    imports.insert(key, pkg);
                }
                Err(err) => warn!("import {:?}: {}", import_path, err),
            }
        }
    }

    let asts: Vec<ast::File> = files.iter().map(|(_, _, f)| f.clone()).collect();
    let result = check_package(&view.store, &view.universe, &path, &name, &asts, &scopes);

    Ok(Arc::new(Package {
        id,
        path,
        name,
        files: files.iter().map(|(_, fid, _)| *fid).collect(),
        filenames: files
            .iter()
            .map(|(p, _, _)| Arc::from(p.to_string_lossy().replace('\\', "/").as_str()))
            .collect(),
        syntax: asts,
        info: result.info,
        scope: Arc::new(result.scope),
        imports,
    }))
}
