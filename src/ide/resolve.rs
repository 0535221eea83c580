//! Position resolution: `(path, line, character)` → the identifier under
//! the cursor.
//!
//! The resolver finds the enclosing node path and reduces it to the most
//! specific identifier: calls resolve through their callee, selectors
//! through their selected name, type specs and function declarations
//! through their name. Definition and reference requests wrap the whole
//! resolution in the off-by-one retry, recovering the common case of a
//! cursor sitting just past the identifier's end.

use std::path::Path;
use std::sync::Arc;

use crate::base::{FileId, LineCol, TextSize};
use crate::project::{Package, View};
use crate::syntax::{ast, enclosing_path, Node};

use super::IdeError;

/// A type-checked cursor position.
pub struct PositionInfo {
    pub pkg: Arc<Package>,
    pub file: FileId,
    pub offset: TextSize,
}

/// Locate the package and absolute offset for a cursor position.
/// Consults the overlay through the view's loader.
pub fn typecheck(
    view: &View,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<PositionInfo, IdeError> {
    let pkg = view.package_for_file(path)?;
    let file = view
        .fset
        .get_file_id(path)
        .ok_or_else(|| IdeError::NotFound(format!("file not loaded: {}", path.display())))?;
    let offset = view
        .fset
        .offset(file, LineCol::new(line, character))
        .ok_or(IdeError::InvalidNode)?;
    Ok(PositionInfo { pkg, file, offset })
}

/// The enclosing node path at an offset, innermost first.
pub fn path_nodes<'p>(
    pkg: &'p Package,
    file: FileId,
    offset: TextSize,
) -> Result<Vec<Node<'p>>, IdeError> {
    let syntax = pkg
        .file_syntax(file)
        .ok_or_else(|| IdeError::NotFound("file not part of package".to_string()))?;
    Ok(enclosing_path(syntax, offset))
}

/// Reduce a node path to the identifier it designates.
pub fn reduce_to_ident<'p>(path: &[Node<'p>]) -> Result<&'p ast::Ident, IdeError> {
    match path.first() {
        Some(Node::Ident(id)) => Ok(id),
        Some(Node::TypeSpec(spec)) => Ok(&spec.name),
        Some(Node::FuncDecl(decl)) => Ok(&decl.name),
        Some(Node::Call(call)) => reduce_call(call),
        Some(Node::Selector(sel)) => match sel {
            ast::Expr::Selector { sel, .. } => Ok(sel),
            _ => Err(IdeError::InvalidNode),
        },
        _ => Err(IdeError::InvalidNode),
    }
}

/// `CallExpr → CallExpr.Fun`, recursively, then through selectors.
fn reduce_call(call: &ast::Expr) -> Result<&ast::Ident, IdeError> {
    match call {
        ast::Expr::Call { fun, .. } => match fun.as_ref() {
            ast::Expr::Ident(id) => Ok(id),
            ast::Expr::Selector { sel, .. } => Ok(sel),
            inner @ ast::Expr::Call { .. } => reduce_call(inner),
            _ => Err(IdeError::InvalidNode),
        },
        _ => Err(IdeError::InvalidNode),
    }
}

/// Convenience: resolve straight to the identifier under the cursor.
pub fn ident_at<'p>(
    pkg: &'p Package,
    file: FileId,
    offset: TextSize,
) -> Result<&'p ast::Ident, IdeError> {
    let path = path_nodes(pkg, file, offset)?;
    reduce_to_ident(&path)
}

/// The off-by-one retry: run `f` at `character`; on failure retry once
/// at `character - 1`. If both fail, the *original* error is surfaced.
/// A successful first attempt never retries.
pub fn with_retry<T>(
    character: u32,
    mut f: impl FnMut(u32) -> Result<T, IdeError>,
) -> Result<T, IdeError> {
    match f(character) {
        Ok(value) => Ok(value),
        Err(original) => {
            if character > 0 {
                if let Ok(value) = f(character - 1) {
                    return Ok(value);
                }
            }
            Err(original)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_retry_success_never_retries() {
        let mut calls = Vec::new();
        let result = with_retry(5, |ch| {
            calls.push(ch);
            Ok::<_, IdeError>(ch)
        });
        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls, vec![5]);
    }

    #[test]
    fn test_with_retry_recovers_at_minus_one() {
        let result = with_retry(5, |ch| {
            if ch == 4 {
                Ok(ch)
            } else {
                Err(IdeError::InvalidNode)
            }
        });
        assert_eq!(result.unwrap(), 4);
    }

    #[test]
    fn test_with_retry_surfaces_original_error() {
        let result: Result<u32, _> = with_retry(5, |ch| {
            if ch == 5 {
                Err(IdeError::NotFound("original".to_string()))
            } else {
                Err(IdeError::InvalidNode)
            }
        });
        match result {
            Err(IdeError::NotFound(msg)) => assert_eq!(msg, "original"),
            other => panic!("expected the original error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_retry_at_column_zero() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(0, |_| {
            calls += 1;
            Err(IdeError::InvalidNode)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
