//! The analyzed package value.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::FileId;
use crate::syntax::ast;
use crate::types::{PkgScope, TypesInfo};

/// The canonical path of the builtin namespace.
pub const BUILTIN_PKG: &str = "builtin";

/// A fully analyzed package.
///
/// Published packages are immutable: the cache installs a finished value
/// behind `Arc` and replaces it wholesale on invalidation. A directory may
/// yield up to three sibling packages (main, internal test variant,
/// external test package), distinguished by `id`.
#[derive(Debug)]
pub struct Package {
    /// Unique id per view: the import path, `"<path> [test]"` for the
    /// internal test variant, or `"<path>_test"` for the external one.
    pub id: Arc<str>,
    /// Canonical import path.
    pub path: Arc<str>,
    /// Short name used in source.
    pub name: SmolStr,
    /// Files actually included in this package, in parse order.
    pub files: Vec<FileId>,
    /// Filenames (forward slashes), parallel to `files`.
    pub filenames: Vec<Arc<str>>,
    /// Parsed syntax trees, parallel to `files`.
    pub syntax: Vec<ast::File>,
    /// The checker's lookup tables.
    pub info: TypesInfo,
    /// Package-level scope, for importers.
    pub scope: Arc<PkgScope>,
    /// Direct imports. Transitive closure is reachable through the
    /// imported packages' own maps.
    pub imports: FxHashMap<Arc<str>, Arc<Package>>,
}

impl Package {
    /// A direct import by path, if present.
    pub fn get_import(&self, path: &str) -> Option<&Arc<Package>> {
        self.imports.get(path)
    }

    /// The syntax tree of one of this package's files.
    pub fn file_syntax(&self, file: FileId) -> Option<&ast::File> {
        let idx = self.files.iter().position(|f| *f == file)?;
        self.syntax.get(idx)
    }

    /// The filename of one of this package's files.
    pub fn filename(&self, file: FileId) -> Option<&Arc<str>> {
        let idx = self.files.iter().position(|f| *f == file)?;
        self.filenames.get(idx)
    }

    /// Whether this is a test variant rather than the main package.
    pub fn is_test_variant(&self) -> bool {
        self.id.as_ref() != self.path.as_ref()
    }
}
