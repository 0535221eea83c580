//! IDE features — the semantic editor requests.
//!
//! Each function corresponds to one LSP request and runs pure over a
//! view snapshot: data in, data out, no LSP types. The dispatch layer
//! converts at the boundary.

pub mod definition;
pub mod hover;
pub mod implementation;
pub mod references;
pub mod resolve;
pub mod signature;
pub mod symbols;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::base::{FileId, LineCol, TextRange};
use crate::project::{CanceledError, LoadError, View};

pub use definition::{definition, type_definition, xdefinition, SymbolLocation};
pub use hover::{hover, HoverContent, HoverResult};
pub use implementation::{implementation, ImplementationLocation};
pub use references::references;
pub use resolve::with_retry;
pub use signature::{signature_help, SignatureHelp};
pub use symbols::{
    document_symbols, workspace_symbols, Query, SymbolDescriptor, SymbolInformation,
    SymbolKind,
};

/// Request-scoped cancellation token, polled at package boundaries.
#[derive(Clone, Default)]
pub struct RequestCtx {
    canceled: Arc<AtomicBool>,
}

impl RequestCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    /// The walk-callback form: `Err(CanceledError)` when canceled.
    pub fn check(&self) -> Result<(), CanceledError> {
        if self.is_canceled() {
            Err(CanceledError)
        } else {
            Ok(())
        }
    }
}

/// The error kinds of the semantic engine. The dispatch layer decides
/// which degrade to empty responses and which surface to the client.
#[derive(Debug, Error)]
pub enum IdeError {
    /// Nothing identifier-like at the cursor (comment, string,
    /// whitespace). Surfaced as an empty result.
    #[error("no identifier found at position")]
    InvalidNode,
    /// The object exists syntactically but has no analyzable definition.
    #[error("{0}")]
    NotFound(String),
    #[error("request canceled")]
    Canceled,
    /// Package loading failed for reasons unrelated to the cursor.
    #[error(transparent)]
    Loader(#[from] LoadError),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl From<CanceledError> for IdeError {
    fn from(_: CanceledError) -> Self {
        IdeError::Canceled
    }
}

impl IdeError {
    /// Errors that degrade to an empty response rather than a protocol
    /// error: nothing at the cursor, nothing analyzable, or a source
    /// tree whose files are all excluded.
    pub fn is_empty_result(&self) -> bool {
        match self {
            IdeError::InvalidNode | IdeError::NotFound(_) => true,
            IdeError::Loader(err) => err.is_empty_package(),
            _ => false,
        }
    }
}

/// A resolved source location, zero-based like the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub uri: String,
    pub start: LineCol,
    pub end: LineCol,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.uri,
            self.start.line_one_indexed(),
            self.start.col_one_indexed(),
            self.end.line_one_indexed(),
            self.end.col_one_indexed()
        )
    }
}

/// Build a [`Location`] for a range in a file of the view.
pub fn location(view: &View, file: FileId, range: TextRange) -> Option<Location> {
    let path = view.fset.path(file)?;
    let index = view.fset.line_index(file)?;
    Some(Location {
        uri: crate::base::uri::path_to_uri(std::path::Path::new(path.as_ref())),
        start: index.line_col(range.start()),
        end: index.line_col(range.end()),
    })
}
