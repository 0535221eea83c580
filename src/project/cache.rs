//! The concurrent package cache.
//!
//! Maps import paths to published packages and source file paths to their
//! owning package. Publication is atomic per package: `put` installs a
//! finished subgraph under the write lock; readers share the read lock.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::uri;

use super::package::Package;

/// The signal error that aborts a cache walk.
///
/// Walk callbacks return it when the request context is canceled; the
/// walk stops and surfaces it to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanceledError;

impl std::fmt::Display for CanceledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request canceled")
    }
}

impl std::error::Error for CanceledError {}

#[derive(Default)]
struct CacheInner {
    /// Package id → package.
    by_id: FxHashMap<Arc<str>, Arc<Package>>,
    /// Import path → package id. The main (non-test) sibling wins.
    by_path: FxHashMap<Arc<str>, Arc<str>>,
    /// Canonical file path → package id.
    by_file: FxHashMap<String, Arc<str>>,
}

/// Concurrent mapping from import path to analyzed package.
#[derive(Default)]
pub struct PackageCache {
    inner: RwLock<CacheInner>,
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a package by import path.
    pub fn get(&self, path: &str) -> Option<Arc<Package>> {
        let inner = self.inner.read();
        let id = inner.by_path.get(path)?;
        inner.by_id.get(id).cloned()
    }

    /// Look up a package by id.
    pub fn get_by_id(&self, id: &str) -> Option<Arc<Package>> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// Look up the package owning a source file. The path is case-folded
    /// and separator-normalized before the lookup.
    pub fn get_by_file(&self, path: &str) -> Option<Arc<Package>> {
        let key = uri::canonical(path);
        let inner = self.inner.read();
        let id = inner.by_file.get(&key)?;
        inner.by_id.get(id).cloned()
    }

    /// Install a package and its import subgraph, deduplicating by id.
    /// Idempotent: re-putting an already-cached id replaces it.
    pub fn put(&self, pkg: &Arc<Package>) {
        let mut inner = self.inner.write();
        let mut seen = FxHashSet::default();
        put_one(&mut inner, pkg, &mut seen);
    }

    /// Drop every package whose import path equals `prefix` or lives
    /// under `prefix/`. Used for module invalidation.
    pub fn remove_path_prefix(&self, prefix: &str) {
        let mut inner = self.inner.write();
        let doomed: Vec<Arc<str>> = inner
            .by_id
            .values()
            .filter(|p| {
                p.path.as_ref() == prefix
                    || p.path.starts_with(&format!("{prefix}/"))
            })
            .map(|p| p.id.clone())
            .collect();
        for id in doomed {
            if let Some(pkg) = inner.by_id.remove(&id) {
                inner.by_path.retain(|_, v| *v != id);
                for filename in &pkg.filenames {
                    let key = uri::canonical(filename);
                    if inner.by_file.get(&key) == Some(&id) {
                        inner.by_file.remove(&key);
                    }
                }
            }
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_id.clear();
        inner.by_path.clear();
        inner.by_file.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every cached package exactly once.
    ///
    /// Packages whose import path extends one of `ranks` (longest-prefix
    /// match) are visited before the rest; ties break lexicographically
    /// by import path, then id. The callback aborts the walk by returning
    /// [`CanceledError`].
    pub fn walk<F>(&self, mut f: F, ranks: &[Arc<str>]) -> Result<(), CanceledError>
    where
        F: FnMut(&Arc<Package>) -> Result<(), CanceledError>,
    {
        let mut pkgs: Vec<Arc<Package>> = self.inner.read().by_id.values().cloned().collect();
        let rank_of = |path: &str| -> usize {
            ranks
                .iter()
                .filter(|r| path == r.as_ref() || path.starts_with(&format!("{r}/")))
                .map(|r| r.len())
                .max()
                .unwrap_or(0)
        };
        pkgs.sort_by(|a, b| {
            let (ra, rb) = (rank_of(&a.path), rank_of(&b.path));
            // Ranked packages first, longer matches first within them.
            rb.cmp(&ra)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.id.cmp(&b.id))
        });
        for pkg in &pkgs {
            f(pkg)?;
        }
        Ok(())
    }
}

fn put_one(inner: &mut CacheInner, pkg: &Arc<Package>, seen: &mut FxHashSet<Arc<str>>) {
    if pkg.syntax.is_empty() || !seen.insert(pkg.id.clone()) {
        return;
    }

    inner.by_id.insert(pkg.id.clone(), pkg.clone());

    // The main sibling owns the import-path slot; a test variant only
    // fills it while no main package is cached.
    let main_entry = pkg.id.as_ref() == pkg.path.as_ref();
    if main_entry || !inner.by_path.contains_key(&pkg.path) {
        inner.by_path.insert(pkg.path.clone(), pkg.id.clone());
    }

    for filename in &pkg.filenames {
        let key = uri::canonical(filename);
        // First writer wins so the main variant keeps file ownership.
        inner.by_file.entry(key).or_insert_with(|| pkg.id.clone());
    }

    for import in pkg.imports.values() {
        put_one(inner, import, seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PkgScope, TypesInfo};
    use rustc_hash::FxHashMap;
    use smol_str::SmolStr;

    fn dummy(id: &str, path: &str, files: &[&str]) -> Arc<Package> {
        Arc::new(Package {
            id: id.into(),
            path: path.into(),
            name: SmolStr::new(path.rsplit('/').next().unwrap_or(path)),
            files: files
                .iter()
                .enumerate()
                .map(|(i, _)| crate::base::FileId::new(i as u32))
                .collect(),
            filenames: files.iter().map(|f| Arc::from(*f)).collect(),
            // A package with no syntax is never published, so give each
            // test package one empty parsed file.
            syntax: files
                .iter()
                .map(|_| crate::syntax::parse_file(crate::base::FileId::new(0), "package p").0)
                .collect(),
            info: TypesInfo::default(),
            scope: Arc::new(PkgScope::default()),
            imports: FxHashMap::default(),
        })
    }

    #[test]
    fn test_put_and_get() {
        let cache = PackageCache::new();
        let pkg = dummy("test/a", "test/a", &["/ws/src/test/a/a.go"]);
        cache.put(&pkg);

        assert!(cache.get("test/a").is_some());
        assert!(cache.get("test/b").is_none());
        assert!(cache.get_by_file("/ws/src/test/a/a.go").is_some());
    }

    #[test]
    fn test_file_lookup_case_folds_drive() {
        let cache = PackageCache::new();
        let pkg = dummy("test/a", "test/a", &["c:/ws/src/test/a/a.go"]);
        cache.put(&pkg);
        assert!(cache.get_by_file("C:\\ws\\src\\test\\a\\a.go").is_some());
    }

    #[test]
    fn test_main_variant_owns_path_slot() {
        let cache = PackageCache::new();
        let test_variant = dummy("test/a [test]", "test/a", &["/ws/a_test.go"]);
        let main = dummy("test/a", "test/a", &["/ws/a.go"]);
        cache.put(&test_variant);
        cache.put(&main);

        assert_eq!(cache.get("test/a").unwrap().id.as_ref(), "test/a");
        // both siblings remain visible to the walk
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_walk_visits_each_package_once_in_rank_order() {
        let cache = PackageCache::new();
        cache.put(&dummy("zeta", "zeta", &["/z/a.go"]));
        cache.put(&dummy("alpha", "alpha", &["/a/a.go"]));
        cache.put(&dummy("mod/inner", "mod/inner", &["/m/a.go"]));

        let mut seen = Vec::new();
        cache
            .walk(
                |p| {
                    seen.push(p.path.to_string());
                    Ok(())
                },
                &[Arc::from("mod")],
            )
            .unwrap();

        assert_eq!(seen, vec!["mod/inner", "alpha", "zeta"]);
    }

    #[test]
    fn test_walk_aborts_on_canceled() {
        let cache = PackageCache::new();
        cache.put(&dummy("a", "a", &["/a/a.go"]));
        cache.put(&dummy("b", "b", &["/b/b.go"]));

        let mut count = 0;
        let err = cache.walk(
            |_| {
                count += 1;
                Err(CanceledError)
            },
            &[],
        );
        assert_eq!(err, Err(CanceledError));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_remove_path_prefix() {
        let cache = PackageCache::new();
        cache.put(&dummy("mod/a", "mod/a", &["/m/a/a.go"]));
        cache.put(&dummy("mod/a/b", "mod/a/b", &["/m/a/b/b.go"]));
        cache.put(&dummy("other", "other", &["/o/o.go"]));

        cache.remove_path_prefix("mod/a");

        assert!(cache.get("mod/a").is_none());
        assert!(cache.get("mod/a/b").is_none());
        assert!(cache.get("other").is_some());
        assert!(cache.get_by_file("/m/a/a.go").is_none());
    }
}
