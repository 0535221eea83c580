//! # golangd
//!
//! Semantic engine and language server for a Go-style, package-oriented
//! systems language: hover, go-to-definition, go-to-type-definition,
//! find-references, implementations, and workspace symbol search over a
//! workspace laid out either as a classical source-path tree
//! (`SRCROOT/src/<import-path>`) or as self-describing module roots.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! server  → LSP dispatch glue (lsp-server / lsp-types)
//!   ↓
//! ide     → hover, definition, references, implementation, symbols
//!   ↓
//! project → workspace classifier, package cache, loader, view, watcher
//!   ↓
//! types   → type universe (objects, method sets, assignability, checker)
//!   ↓
//! syntax  → lexer + parser + AST + node-path walking
//!   ↓
//! base    → primitives (FileId, spans, file set, URI/path mapping)
//! ```

/// Foundation types: FileId, spans, line index, file set, URI mapping
pub mod base;

/// Lexer, parser, and AST for the source language
pub mod syntax;

/// The type universe: objects, types, method sets, the checker
pub mod types;

/// Workspace model: classifier, cache, loader, view, watcher
pub mod project;

/// IDE features: the semantic editor requests
pub mod ide;

/// LSP dispatch glue
pub mod server;

pub use base::{FileId, FileSet, LineCol, LineIndex, Position, TextRange, TextSize};
