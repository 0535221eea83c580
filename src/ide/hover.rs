//! Hover: compose the text shown for the symbol under the cursor.
//!
//! The hover body is the object formatted with an empty package
//! qualifier; struct and interface type names additionally carry a
//! pretty-printed body block after the documentation. The pretty printer
//! does not re-implement the type formatter, it rewrites its one-line
//! output into an indented block.

use std::path::Path;

use crate::base::{FileId, TextRange};
use crate::project::{Package, View};
use crate::syntax::ast;
use crate::types::{empty_qualifier, object_string, type_string, ObjKind, TypeData};

use super::resolve::{path_nodes, reduce_to_ident, typecheck};
use super::{IdeError, RequestCtx};
use crate::syntax::Node;

/// One hover block: a fenced code block in the source language, or plain
/// markup for documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverContent {
    /// `Some("go")` for code blocks, `None` for markup.
    pub language: Option<&'static str>,
    pub value: String,
}

impl HoverContent {
    fn code(value: impl Into<String>) -> Self {
        Self {
            language: Some("go"),
            value: value.into(),
        }
    }

    fn markup(value: impl Into<String>) -> Self {
        Self {
            language: None,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HoverResult {
    pub contents: Vec<HoverContent>,
    pub file: FileId,
    pub range: TextRange,
}

/// `textDocument/hover`.
pub fn hover(
    view: &View,
    _ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Option<HoverResult>, IdeError> {
    let pos = typecheck(view, path, line, character)?;
    let nodes = path_nodes(&pos.pkg, pos.file, pos.offset)?;

    match nodes.first() {
        Some(Node::BasicLit(lit)) => hover_import(&pos.pkg, pos.file, &nodes, lit),
        Some(Node::Ident(_))
        | Some(Node::TypeSpec(_))
        | Some(Node::FuncDecl(_))
        | Some(Node::Call(_))
        | Some(Node::Selector(_)) => {
            let ident = reduce_to_ident(&nodes)?;
            hover_ident(view, &pos.pkg, pos.file, ident)
        }
        _ => Ok(None),
    }
}

/// Hover on an import path: the imported package's clause and doc.
fn hover_import(
    pkg: &Package,
    file: FileId,
    nodes: &[Node<'_>],
    lit: &ast::BasicLit,
) -> Result<Option<HoverResult>, IdeError> {
    let Some(Node::ImportSpec(spec)) = nodes.get(1) else {
        return Ok(None);
    };
    let Some(imported) = pkg.get_import(&lit.string_value()) else {
        return Ok(None);
    };
    let mut contents = vec![HoverContent::code(format!("package {}", imported.name))];
    if let Some(doc) = package_doc(imported) {
        contents.push(HoverContent::markup(doc));
    }
    Ok(Some(HoverResult {
        contents,
        file,
        range: spec.range,
    }))
}

/// The package-clause doc of the first documented file.
fn package_doc(pkg: &Package) -> Option<String> {
    pkg.syntax.iter().find_map(|f| f.doc.clone())
}

fn hover_ident(
    view: &View,
    pkg: &Package,
    file: FileId,
    ident: &ast::Ident,
) -> Result<Option<HoverResult>, IdeError> {
    let store = &view.store;
    let obj = pkg.info.object_at(file, ident.range.start());

    let Some(mut obj) = obj else {
        // Package clause idents have no object.
        return hover_package_clause(pkg, file, ident);
    };

    let original = obj;
    let is_builtin = store.object(obj).range.is_none();
    if is_builtin {
        // Builtins have no useful info of their own; use the definition
        // inside the cached builtin package.
        let Some(builtin) = view.builtin_package() else {
            return Ok(None);
        };
        let Some(redirected) = builtin.scope.lookup(&store.object(obj).name) else {
            return Ok(None);
        };
        obj = redirected;
    }

    let data = store.object(obj);
    let qf = &empty_qualifier;

    let mut text = String::new();
    let mut extra = String::new();
    match &data.kind {
        ObjKind::Var { is_field: true, .. } => {
            text = format!("struct {}", object_string(store, obj, qf));
        }
        ObjKind::TypeName { .. } => {
            let underlying = store.underlying(data.ty);
            match store.type_data(underlying) {
                TypeData::Struct { .. } => {
                    text = format!("type {} struct", data.name);
                    extra = if is_builtin {
                        pretty_print_types_string(&object_string(store, original, qf))
                    } else {
                        pretty_print_types_string(&type_string(store, underlying, qf))
                    };
                }
                TypeData::Interface { .. } => {
                    text = format!("type {} interface", data.name);
                    extra = if is_builtin {
                        pretty_print_types_string(&object_string(store, original, qf))
                    } else {
                        pretty_print_types_string(&type_string(store, underlying, qf))
                    };
                }
                _ => {}
            }
        }
        ObjKind::PkgName { .. } => {
            text = object_string(store, obj, qf);
        }
        _ => {}
    }
    if text.is_empty() {
        text = pretty_print_types_string(&object_string(store, obj, qf));
    }

    let mut contents = vec![HoverContent::code(text)];
    if let Some(doc) = &data.doc {
        if !doc.trim().is_empty() {
            contents.push(HoverContent::markup(doc.clone()));
        }
    }
    if !extra.is_empty() {
        // Extra info comes after the usually more useful documentation.
        contents.push(HoverContent::code(extra));
    }

    Ok(Some(HoverResult {
        contents,
        file,
        range: ident.range,
    }))
}

fn hover_package_clause(
    pkg: &Package,
    file: FileId,
    ident: &ast::Ident,
) -> Result<Option<HoverResult>, IdeError> {
    let is_clause = pkg
        .file_syntax(file)
        .is_some_and(|f| f.package.range == ident.range);
    if !is_clause {
        return Ok(None);
    }
    let mut contents = vec![HoverContent::code(format!("package {}", ident.name))];
    if let Some(doc) = package_doc(pkg) {
        contents.push(HoverContent::markup(doc));
    }
    Ok(Some(HoverResult {
        contents,
        file,
        range: ident.range,
    }))
}

/// Rewrite the one-line formatter output into an indented block:
/// `;`-separated members become lines, tag quotes become raw backticks,
/// braces open and close indentation, and a trailing `{}` body is
/// suppressed entirely.
pub fn pretty_print_types_string(s: &str) -> String {
    // Don't bother including the body if it is empty.
    if s.ends_with("{}") {
        return String::new();
    }
    let bytes = s.as_bytes();
    let mut b = String::with_capacity(s.len());
    let mut depth: usize = 0;
    let mut in_tag = false;

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b';' => {
                if in_tag {
                    b.push(';');
                    i += 1;
                    continue;
                }
                b.push('\n');
                for _ in 0..depth {
                    b.push_str("    ");
                }
                // Skip the following space.
                i += 1;
            }
            b'"' => {
                in_tag = !in_tag;
                b.push('`');
            }
            b'\\' => {
                b.push('"');
                // Skip the escaped quote.
                i += 1;
            }
            b'{' => {
                if i == bytes.len() - 1 {
                    // Unbalanced input; give up and return it untouched.
                    return s.to_string();
                }
                if bytes[i + 1] == b'}' {
                    // Do not modify {}.
                    b.push_str("{}");
                    i += 1;
                } else if bytes[i + 1] == b'\n' {
                    // Already formatted; keep it so re-running is a
                    // fixed point.
                    depth += 1;
                    b.push('{');
                } else {
                    depth += 1;
                    b.push_str(" {\n");
                    for _ in 0..depth {
                        b.push_str("    ");
                    }
                }
            }
            b'}' => {
                if depth == 0 {
                    return s.to_string();
                }
                depth -= 1;
                if b.ends_with('\n') {
                    b.push('}');
                } else {
                    b.push_str("\n}");
                }
            }
            other => b.push(other as char),
        }
        i += 1;
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_print_struct() {
        let s = "struct{Name string; Age int}";
        assert_eq!(
            pretty_print_types_string(s),
            "struct {\n    Name string\n    Age int\n}"
        );
    }

    #[test]
    fn test_pretty_print_empty_body_suppressed() {
        assert_eq!(pretty_print_types_string("struct{}"), "");
        assert_eq!(pretty_print_types_string("type T struct{}"), "");
    }

    #[test]
    fn test_pretty_print_tags_become_backticks() {
        let s = "struct{Name string \"json:\\\"name\\\"\"}";
        assert_eq!(
            pretty_print_types_string(s),
            "struct {\n    Name string `json:\"name\"`\n}"
        );
    }

    #[test]
    fn test_pretty_print_nested() {
        let s = "struct{Inner struct{X int}; Y int}";
        // closing braces are not re-indented, mirroring the formatter
        assert_eq!(
            pretty_print_types_string(s),
            "struct {\n    Inner struct {\n        X int\n}\n    Y int\n}"
        );
    }

    #[test]
    fn test_pretty_print_semicolon_inside_tag_kept() {
        let s = "struct{A int \"k:\\\"x;y\\\"\"}";
        let out = pretty_print_types_string(s);
        assert!(out.contains("x;y"));
    }

    #[test]
    fn test_pretty_print_unbalanced_returns_input() {
        assert_eq!(pretty_print_types_string("}oops"), "}oops");
    }

    #[test]
    fn test_pretty_print_fixed_point() {
        let s = "struct{Name string; Age int}";
        let once = pretty_print_types_string(s);
        let twice = pretty_print_types_string(&once);
        assert_eq!(once.trim_end_matches('\n'), twice.trim_end_matches('\n'));
    }
}
