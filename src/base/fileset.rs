//! The shared position table for source files.
//!
//! Every package in a view hangs its syntax trees off one [`FileSet`]: it
//! assigns stable [`FileId`]s to paths, stores file contents, and converts
//! absolute byte offsets into full [`Position`]s. The file set lives as
//! long as any dependent package exists, so positions recorded in type
//! information stay resolvable after individual packages are replaced.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::span::{LineCol, LineIndex, TextSize};
use super::FileId;

/// A fully resolved source position: `(filename, offset, line, column)`.
///
/// Line and column are 1-based for display; the wire protocol subtracts
/// one at the boundary.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Position {
    pub filename: Arc<str>,
    pub offset: TextSize,
    /// 1-based line
    pub line: u32,
    /// 1-based column (UTF-8 bytes)
    pub column: u32,
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// Manages the mapping between file paths, FileIds, contents, and line
/// indexes.
///
/// Lookups are cheap; mutation follows the double-checked read/write-lock
/// pattern so hot paths stay on the read lock.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    /// Path → FileId mapping
    path_to_id: IndexMap<PathBuf, FileId>,
    /// FileId → Path mapping (reverse lookup)
    id_to_path: IndexMap<FileId, Arc<str>>,
    /// FileId → Contents
    contents: IndexMap<FileId, Arc<str>>,
    /// FileId → line index over contents
    lines: IndexMap<FileId, Arc<LineIndex>>,
    /// Next FileId to assign
    next_id: u32,
}

impl FileSet {
    /// Create a new empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a FileId for a path.
    pub fn file_id(&self, path: &Path) -> FileId {
        // Fast path: read lock
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        // Slow path: write lock
        let mut inner = self.inner.write();

        // Double-check
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        let display: Arc<str> = path.to_string_lossy().replace('\\', "/").into();
        inner.id_to_path.insert(id, display);
        id
    }

    /// Look up the FileId for a path without creating one.
    pub fn get_file_id(&self, path: &Path) -> Option<FileId> {
        self.inner.read().path_to_id.get(path).copied()
    }

    /// Get the path (with forward slashes) for a FileId.
    pub fn path(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().id_to_path.get(&file).cloned()
    }

    /// Set the contents of a file, rebuilding its line index.
    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) {
        let contents = contents.into();
        let index = Arc::new(LineIndex::new(&contents));
        let mut inner = self.inner.write();
        inner.contents.insert(file, contents);
        inner.lines.insert(file, index);
    }

    /// Get the contents of a file.
    pub fn contents(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().contents.get(&file).cloned()
    }

    /// Get the line index of a file.
    pub fn line_index(&self, file: FileId) -> Option<Arc<LineIndex>> {
        self.inner.read().lines.get(&file).cloned()
    }

    /// Resolve an absolute offset in a file to a full [`Position`].
    pub fn position(&self, file: FileId, offset: TextSize) -> Option<Position> {
        let inner = self.inner.read();
        let filename = inner.id_to_path.get(&file)?.clone();
        let line_col = inner.lines.get(&file)?.line_col(offset);
        Some(Position {
            filename,
            offset,
            line: line_col.line_one_indexed(),
            column: line_col.col_one_indexed(),
        })
    }

    /// Convert a 0-based line/column to an absolute offset in a file.
    pub fn offset(&self, file: FileId, line_col: LineCol) -> Option<TextSize> {
        self.inner.read().lines.get(&file)?.offset(line_col)
    }

    /// Remove a file from the set.
    pub fn remove(&self, file: FileId) {
        let mut inner = self.inner.write();
        if let Some(path) = inner.id_to_path.swap_remove(&file) {
            let owned = PathBuf::from(path.as_ref());
            inner.path_to_id.swap_remove(&owned);
        }
        inner.contents.swap_remove(&file);
        inner.lines.swap_remove(&file);
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    /// Check if the file set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all file IDs, in registration order.
    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().id_to_path.keys().copied().collect()
    }
}
