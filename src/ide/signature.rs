//! Signature help for the enclosing call expression.

use std::path::Path;

use crate::project::View;
use crate::syntax::{ast, Node};
use crate::types::{empty_qualifier, signature_suffix, type_string, TypeData};

use super::resolve::{path_nodes, typecheck};
use super::{IdeError, RequestCtx};

#[derive(Debug, Clone)]
pub struct SignatureHelp {
    /// The signature's printed form without package qualifiers.
    pub label: String,
    /// One label per parameter.
    pub parameters: Vec<String>,
    /// Doc comment of the called declaration, if any.
    pub documentation: Option<String>,
    pub active_parameter: usize,
}

/// `textDocument/signatureHelp`.
pub fn signature_help(
    view: &View,
    _ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Option<SignatureHelp>, IdeError> {
    let pos = typecheck(view, path, line, character)?;
    let nodes = path_nodes(&pos.pkg, pos.file, pos.offset)?;

    // The innermost enclosing call expression.
    let Some(Node::Call(call)) = nodes
        .iter()
        .find(|n| matches!(n, Node::Call(_)))
        .copied()
    else {
        return Ok(None);
    };
    let ast::Expr::Call { fun, args, .. } = call else {
        return Ok(None);
    };

    let store = &view.store;
    let Some(sig) = pos.pkg.info.type_of(pos.file, fun.range()) else {
        return Ok(None);
    };
    let TypeData::Signature { params, .. } = store.type_data(sig) else {
        return Ok(None);
    };

    let qf = &empty_qualifier;
    let label = format!("func{}", signature_suffix(store, sig, qf));
    let parameters: Vec<String> = params
        .iter()
        .map(|p| {
            let data = store.object(*p);
            if data.name.is_empty() {
                type_string(store, data.ty, qf)
            } else {
                format!("{} {}", data.name, type_string(store, data.ty, qf))
            }
        })
        .collect();

    let mut active_parameter = args.len();
    for (index, arg) in args.iter().enumerate() {
        if arg.range().end() >= pos.offset {
            active_parameter = index;
            break;
        }
    }

    // Documentation from the called function's declaration site.
    let fun_ident = match fun.as_ref() {
        ast::Expr::Ident(id) => Some(id),
        ast::Expr::Selector { sel, .. } => Some(sel),
        _ => None,
    };
    let documentation = fun_ident
        .and_then(|id| pos.pkg.info.object_at(pos.file, id.range.start()))
        .and_then(|obj| store.object(obj).doc);

    Ok(Some(SignatureHelp {
        label,
        parameters,
        documentation,
        active_parameter,
    }))
}
