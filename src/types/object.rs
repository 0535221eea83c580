//! Objects: the symbols of the type universe.
//!
//! An object is anything an identifier can resolve to: a named type, a
//! function or method, a variable or field, a constant, an imported
//! package name, a builtin, or a statement label. Objects live in the
//! view-wide [`Store`], referenced by [`ObjId`]; identity of two
//! resolutions is identity of their ids.
//!
//! [`Store`]: crate::types::Store

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::base::{is_exported, FileId, TextRange};

use super::ty::TypeId;

/// A handle to an object in the view's store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjId(pub u32);

impl ObjId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({})", self.0)
    }
}

/// The variant of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjKind {
    TypeName {
        /// `type A = B` alias declarations.
        alias: bool,
    },
    Func {
        /// Receiver type for methods; `None` for free functions.
        recv: Option<TypeId>,
    },
    Var {
        is_field: bool,
        embedded: bool,
    },
    Const,
    PkgName {
        /// Import path of the designated package.
        imported: Arc<str>,
    },
    Builtin,
    Label,
}

/// The data of one object.
///
/// `range` is `None` exactly for builtins (invalid position), and `pkg`
/// is `None` exactly for objects owned by the universe scope.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub name: SmolStr,
    pub kind: ObjKind,
    /// Owning package import path; `None` for universe builtins.
    pub pkg: Option<Arc<str>>,
    pub file: Option<FileId>,
    pub range: Option<TextRange>,
    pub ty: TypeId,
    pub doc: Option<String>,
}

impl ObjectData {
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }

    /// Builtins are the objects without a valid declaration position.
    pub fn is_builtin_pos(&self) -> bool {
        self.range.is_none()
    }

    pub fn is_type_name(&self) -> bool {
        matches!(self.kind, ObjKind::TypeName { .. })
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.kind, ObjKind::TypeName { alias: true })
    }
}
