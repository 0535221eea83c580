//! Implementation search.
//!
//! For a queried type `T` (or method on `T`), every named type of the
//! workspace plus the built-in `error` interface is partitioned by
//! assignability into `to` (implementers of the interface `T`), `from`
//! (interfaces `T` implements), and `from*` (interfaces `*T`
//! implements). When a method was selected, each result type projects to
//! the corresponding method of its method set.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::project::View;
use crate::types::{full_qualifier, type_string, ObjKind, TypeData, TypeId, INVALID};

use super::resolve::{ident_at, typecheck};
use super::{location, IdeError, Location, RequestCtx};

/// One implementation result, tagged with its relation to the query.
#[derive(Debug, Clone)]
pub struct ImplementationLocation {
    pub location: Location,
    /// `"to"` or `"from"`.
    pub typ: &'static str,
    /// The relation holds for the pointer form only.
    pub ptr: bool,
    /// The location is a projected method rather than a type.
    pub method: bool,
}

/// `textDocument/implementation`.
pub fn implementation(
    view: &View,
    ctx: &RequestCtx,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<Vec<ImplementationLocation>, IdeError> {
    let pos = typecheck(view, path, line, character)?;
    let ident = ident_at(&pos.pkg, pos.file, pos.offset)?;

    let store = &view.store;

    // Selected method, or the type under the cursor.
    let mut method = None;
    let mut queried: TypeId = INVALID;
    if let Some(obj) = pos.pkg.info.object_at(pos.file, ident.range.start()) {
        let data = store.object(obj);
        match &data.kind {
            ObjKind::Func { recv: Some(recv) } => {
                method = Some(obj);
                queried = *recv;
            }
            ObjKind::TypeName { .. } => queried = data.ty,
            _ => queried = data.ty,
        }
    }
    if queried == INVALID {
        queried = pos
            .pkg
            .info
            .type_of(pos.file, ident.range)
            .unwrap_or(INVALID);
    }
    if queried == INVALID {
        return Err(IdeError::NotFound(
            "not a type, method, or value".to_string(),
        ));
    }

    // All named types of the workspace, aliases excluded, plus the
    // built-in error interface.
    let mut all_named: Vec<TypeId> = Vec::new();
    view.search(|pkg| {
        ctx.check()?;
        // The internal test variant re-declares the main package's
        // types at the same positions; skip the duplicates.
        if pkg.id.ends_with(" [test]") {
            return Ok(());
        }
        for entry in pkg.info.defs.values() {
            let data = store.object(entry.obj);
            if data.is_type_name() && !data.is_alias() {
                if matches!(store.type_data(data.ty), TypeData::Named { .. }) {
                    all_named.push(data.ty);
                }
            }
        }
        Ok(())
    })?;
    all_named.push(view.universe.error_type);

    let query_is_interface = store.is_interface(queried);
    if query_is_interface && store.interface_methods(queried).is_empty() {
        // The empty interface matches everything and means nothing.
        return Ok(Vec::new());
    }

    let mut to: Vec<TypeId> = Vec::new();
    let mut from: Vec<TypeId> = Vec::new();
    let mut from_ptr: Vec<TypeId> = Vec::new();

    for candidate in all_named {
        if query_is_interface {
            if store.is_interface(candidate) {
                if store.interface_methods(candidate).is_empty() {
                    continue;
                }
                if !store.identical(queried, candidate) {
                    if store.assignable_to(candidate, queried) {
                        to.push(candidate);
                    }
                    if store.assignable_to(queried, candidate) {
                        from.push(candidate);
                    }
                }
            } else if store.assignable_to(candidate, queried) {
                to.push(candidate);
            } else {
                let ptr = store.alloc_type(TypeData::Pointer { elem: candidate });
                if store.assignable_to(ptr, queried) {
                    to.push(ptr);
                }
            }
        } else if store.is_interface(candidate) {
            if store.interface_methods(candidate).is_empty() {
                continue;
            }
            if store.assignable_to(queried, candidate) {
                from.push(candidate);
            } else {
                let ptr = store.alloc_type(TypeData::Pointer { elem: queried });
                if store.assignable_to(ptr, candidate) {
                    from_ptr.push(candidate);
                }
            }
        }
    }

    // Deterministic output: sort by printed form.
    let printed = |t: &TypeId| type_string(store, *t, &full_qualifier);
    to.sort_by_key(printed);
    from.sort_by_key(printed);
    from_ptr.sort_by_key(printed);

    let method_name = method.map(|m| store.object(m).name);
    let mut seen = FxHashSet::default();
    let mut locations = Vec::new();

    let mut emit = |t: TypeId, typ: &'static str, ptr: bool, locations: &mut Vec<_>| {
        let obj = if let Some(name) = &method_name {
            // Project the result type to the matching method.
            let Some((_, m)) = store
                .method_set(t)
                .into_iter()
                .find(|(n, _)| n == name)
            else {
                return;
            };
            if !seen.insert(m) {
                // Already reported via another embedding path.
                return;
            }
            m
        } else {
            let Some(tn) = store.named_obj(store.deref(t)) else {
                return;
            };
            tn
        };
        let data = store.object(obj);
        let (Some(file), Some(range)) = (data.file, data.range) else {
            return;
        };
        let Some(loc) = location(view, file, range) else {
            return;
        };
        locations.push(ImplementationLocation {
            location: loc,
            typ,
            ptr,
            method: method_name.is_some(),
        });
    };

    for t in to {
        let ptr = store.is_pointer(t);
        emit(t, "to", ptr, &mut locations);
    }
    for t in from {
        emit(t, "from", false, &mut locations);
    }
    for t in from_ptr {
        emit(t, "from", true, &mut locations);
    }

    Ok(locations)
}
