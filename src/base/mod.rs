//! Foundation types for the language server.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Interned file identifiers
//! - [`TextRange`], [`TextSize`] - Source positions
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`FileSet`], [`Position`] - The shared position table packages hang
//!   their syntax trees off
//! - [`uri`] - `file://` URI ↔ filesystem path mapping
//!
//! This module has NO dependencies on other golangd modules.

mod fileset;
mod span;
pub mod uri;

pub use fileset::{FileSet, Position};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;

use std::fmt;

/// An interned identifier for a source file.
///
/// The [`FileSet`] assigns one per path; everything downstream (AST
/// nodes, the checker's `defs`/`uses` keys, cache file lookups) carries
/// the 4-byte handle instead of the path, so position keys stay `Copy`
/// and comparisons stay O(1).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

impl From<u32> for FileId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<FileId> for u32 {
    #[inline]
    fn from(id: FileId) -> Self {
        id.0
    }
}

/// Whether an identifier is exported (starts with an upper-case letter).
///
/// The blank identifier `_` is never exported.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_is_a_stable_key() {
        use std::collections::HashSet;

        let a = FileId::new(1);
        let b = FileId::new(1);
        assert_eq!(a, b);
        assert_ne!(a, FileId::new(2));

        // usable as a map key without duplicates
        let mut set = HashSet::new();
        set.insert(FileId::new(1));
        set.insert(FileId::new(2));
        set.insert(FileId::new(1));
        assert_eq!(set.len(), 2);

        // stays a 4-byte handle
        assert_eq!(std::mem::size_of::<FileId>(), 4);
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Println"));
        assert!(is_exported("A"));
        assert!(!is_exported("fprintln"));
        assert!(!is_exported("_"));
        assert!(!is_exported(""));
    }
}
