//! Type information tables produced by the checker.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{FileId, TextRange, TextSize};

use super::object::ObjId;
use super::ty::TypeId;

/// One recorded identifier resolution.
#[derive(Debug, Clone)]
pub struct IdentEntry {
    pub name: SmolStr,
    pub range: TextRange,
    pub obj: ObjId,
}

/// The three lookup tables of an analyzed package.
///
/// Keys are ordered `(file, offset)` pairs so iteration follows file-set
/// order; deterministic enumeration is part of the search contracts.
#[derive(Debug, Clone, Default)]
pub struct TypesInfo {
    /// Declaration identifiers → the object they define.
    pub defs: BTreeMap<(FileId, TextSize), IdentEntry>,
    /// Use identifiers → the object they denote.
    pub uses: BTreeMap<(FileId, TextSize), IdentEntry>,
    /// Expression ranges → their types.
    pub type_of: BTreeMap<(FileId, TextSize, TextSize), TypeId>,
}

impl TypesInfo {
    /// The object defined or used by the identifier starting at `(file, start)`.
    /// Checks `defs` first, then `uses`.
    pub fn object_at(&self, file: FileId, start: TextSize) -> Option<ObjId> {
        self.defs
            .get(&(file, start))
            .or_else(|| self.uses.get(&(file, start)))
            .map(|e| e.obj)
    }

    pub fn def_at(&self, file: FileId, start: TextSize) -> Option<ObjId> {
        self.defs.get(&(file, start)).map(|e| e.obj)
    }

    pub fn use_at(&self, file: FileId, start: TextSize) -> Option<ObjId> {
        self.uses.get(&(file, start)).map(|e| e.obj)
    }

    /// The type recorded for an expression range.
    pub fn type_of(&self, file: FileId, range: TextRange) -> Option<TypeId> {
        self.type_of
            .get(&(file, range.start(), range.end()))
            .copied()
    }

    pub fn record_def(&mut self, file: FileId, entry: IdentEntry) {
        self.defs.insert((file, entry.range.start()), entry);
    }

    pub fn record_use(&mut self, file: FileId, entry: IdentEntry) {
        self.uses.insert((file, entry.range.start()), entry);
    }

    pub fn record_type(&mut self, file: FileId, range: TextRange, ty: TypeId) {
        self.type_of.insert((file, range.start(), range.end()), ty);
    }
}

/// The package-level scope of an analyzed package, as seen by importers
/// and by the checker of dependent packages.
#[derive(Debug, Clone, Default)]
pub struct PkgScope {
    /// Canonical import path.
    pub path: Arc<str>,
    /// Short name used in source.
    pub name: SmolStr,
    /// Package-level objects by name.
    pub names: FxHashMap<SmolStr, ObjId>,
}

impl PkgScope {
    pub fn lookup(&self, name: &str) -> Option<ObjId> {
        self.names.get(name).copied()
    }
}
