//! Go-to-definition, type definition, and the xdefinition extension.

use std::path::Path;

use crate::project::{View, BUILTIN_PKG};
use crate::types::{ObjId, ObjKind};

use super::resolve::{ident_at, typecheck, with_retry};
use super::symbols::SymbolDescriptor;
use super::{location, IdeError, Location, RequestCtx};

/// A definition with optional type location and symbol metadata, the
/// payload of `textDocument/xdefinition`.
#[derive(Debug, Clone)]
pub struct SymbolLocation {
    pub location: Location,
    pub type_location: Option<Location>,
    pub symbol: Option<SymbolDescriptor>,
}

/// `textDocument/definition`.
pub fn definition(
    view: &View,
    ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Vec<Location>, IdeError> {
    Ok(xdefinition(view, ctx, path, line, character)?
        .into_iter()
        .map(|s| s.location)
        .collect())
}

/// `textDocument/typeDefinition`: not everything with a definition also
/// has a type definition.
pub fn type_definition(
    view: &View,
    ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Vec<Location>, IdeError> {
    Ok(xdefinition(view, ctx, path, line, character)?
        .into_iter()
        .filter_map(|s| s.type_location)
        .collect())
}

/// `textDocument/xdefinition`, with the off-by-one retry.
pub fn xdefinition(
    view: &View,
    ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Vec<SymbolLocation>, IdeError> {
    with_retry(character, |ch| do_xdefinition(view, ctx, path, line, ch))
}

fn do_xdefinition(
    view: &View,
    _ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Vec<SymbolLocation>, IdeError> {
    let pos = typecheck(view, path, line, character)?;
    let ident = ident_at(&pos.pkg, pos.file, pos.offset)?;

    let store = &view.store;
    let mut obj = pos
        .pkg
        .info
        .object_at(pos.file, ident.range.start())
        .ok_or_else(|| IdeError::NotFound("definition not found".to_string()))?;

    // Embedded field shorthand: jump to the type, not the field.
    let data = store.object(obj);
    if let ObjKind::Var { embedded: true, .. } = data.kind {
        if let Some(type_name) = store.named_obj(data.ty) {
            obj = type_name;
        }
    }

    // The type of the queried identifier, for the type location.
    let mut ident_type = pos.pkg.info.type_of(pos.file, ident.range);

    let mut data = store.object(obj);
    if data.range.is_none() {
        // Builtins have an invalid position; re-look up the same-named
        // object inside the cached builtin package and use its site.
        let Some(builtin) = view.builtin_package() else {
            return Ok(Vec::new());
        };
        let Some(redirected) = builtin.scope.lookup(&data.name) else {
            return Ok(Vec::new());
        };
        obj = redirected;
        data = store.object(obj);
        ident_type = Some(data.ty);
    }

    let (Some(file), Some(range)) = (data.file, data.range) else {
        return Ok(Vec::new());
    };
    let Some(loc) = location(view, file, range) else {
        return Ok(Vec::new());
    };

    let type_location = ident_type
        .or(Some(data.ty))
        .and_then(|t| store.named_obj(store.deref(t)))
        .and_then(|tn| {
            let td = store.object(tn);
            let (file, range) = (td.file?, td.range?);
            location(view, file, range)
        });

    let symbol = Some(describe(view, obj));

    Ok(vec![SymbolLocation {
        location: loc,
        type_location,
        symbol,
    }])
}

/// Build the `SymbolDescriptor` metadata for a definition.
fn describe(view: &View, obj: ObjId) -> SymbolDescriptor {
    let store = &view.store;
    let data = store.object(obj);
    let package = data
        .pkg
        .as_deref()
        .unwrap_or(BUILTIN_PKG)
        .to_string();
    let package_name = view
        .cache
        .get(&package)
        .map(|p| p.name.to_string())
        .unwrap_or_else(|| {
            package
                .rsplit('/')
                .next()
                .unwrap_or(package.as_str())
                .to_string()
        });
    let recv = match &data.kind {
        ObjKind::Func { recv: Some(r) } => store
            .named_obj(*r)
            .map(|tn| store.object(tn).name.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    SymbolDescriptor::new(package, package_name, recv, data.name.to_string())
}
