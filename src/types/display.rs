//! Formatting of objects and types.
//!
//! The formatter mirrors the source language's conventional notation:
//! `struct{Name string "json:\"name\""}`, `func (T) M(p []byte) (int, error)`,
//! `package fmt ("fmt")`. A caller-supplied qualifier decides how owning
//! package paths are rendered; hover passes the empty qualifier so names
//! elide their package prefix.

use super::object::{ObjId, ObjKind, ObjectData};
use super::ty::{Store, TypeData, TypeId};

/// Maps a package path to the prefix used in printed names.
/// Return an empty string to elide the package.
pub type Qualifier<'a> = &'a dyn Fn(&str) -> String;

/// The qualifier printing full package paths.
pub fn full_qualifier(path: &str) -> String {
    path.to_string()
}

/// The qualifier eliding all package prefixes.
pub fn empty_qualifier(_: &str) -> String {
    String::new()
}

/// Render a type.
pub fn type_string(store: &Store, t: TypeId, qf: Qualifier<'_>) -> String {
    match store.type_data(t) {
        TypeData::Invalid => "invalid type".to_string(),
        TypeData::Basic(b) => b.name().to_string(),
        TypeData::Named { obj, .. } => {
            let data = store.object(obj);
            match data.pkg.as_deref().map(qf) {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{}.{}", prefix, data.name)
                }
                _ => data.name.to_string(),
            }
        }
        TypeData::Pointer { elem } => format!("*{}", type_string(store, elem, qf)),
        TypeData::Slice { elem } => format!("[]{}", type_string(store, elem, qf)),
        TypeData::Map { key, value } => format!(
            "map[{}]{}",
            type_string(store, key, qf),
            type_string(store, value, qf)
        ),
        TypeData::Struct { fields, tags } => {
            let mut parts = Vec::with_capacity(fields.len());
            for (i, f) in fields.iter().enumerate() {
                let data = store.object(*f);
                let mut s = if matches!(data.kind, ObjKind::Var { embedded: true, .. }) {
                    type_string(store, data.ty, qf)
                } else {
                    format!("{} {}", data.name, type_string(store, data.ty, qf))
                };
                if let Some(Some(tag)) = tags.get(i) {
                    s.push_str(&format!(" {:?}", tag.as_str()));
                }
                parts.push(s);
            }
            format!("struct{{{}}}", parts.join("; "))
        }
        TypeData::Interface { methods, embeddeds } => {
            let mut parts = Vec::new();
            for m in methods {
                let data = store.object(m);
                parts.push(format!(
                    "{}{}",
                    data.name,
                    signature_suffix(store, data.ty, qf)
                ));
            }
            for e in embeddeds {
                parts.push(type_string(store, e, qf));
            }
            format!("interface{{{}}}", parts.join("; "))
        }
        TypeData::Signature { .. } => format!("func{}", signature_suffix(store, t, qf)),
    }
}

/// The `(params) results` part of a signature, without the `func` keyword.
pub fn signature_suffix(store: &Store, sig: TypeId, qf: Qualifier<'_>) -> String {
    let TypeData::Signature {
        params, results, ..
    } = store.type_data(sig)
    else {
        return "()".to_string();
    };

    let params: Vec<String> = params
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

    let results_str = match results.len() {
        0 => String::new(),
        1 => format!(" {}", type_string(store, results[0], qf)),
        _ => format!(
            " ({})",
            results
                .iter()
                .map(|r| type_string(store, *r, qf))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    format!("({}){}", params.join(", "), results_str)
}

/// Render an object the way the language's tooling prints it.
pub fn object_string(store: &Store, obj: ObjId, qf: Qualifier<'_>) -> String {
    let data = store.object(obj);
    let qualified = qualified_name(&data, qf);
    match &data.kind {
        ObjKind::TypeName { alias } => {
            let rhs = if *alias {
                type_string(store, data.ty, qf)
            } else {
                type_string(store, store.underlying(data.ty), qf)
            };
            if *alias {
                format!("type {} = {}", qualified, rhs)
            } else {
                format!("type {} {}", qualified, rhs)
            }
        }
        ObjKind::Func { recv: Some(recv) } => format!(
            "func ({}) {}{}",
            type_string(store, *recv, qf),
            data.name,
            signature_suffix(store, data.ty, qf)
        ),
        ObjKind::Func { recv: None } => {
            format!("func {}{}", qualified, signature_suffix(store, data.ty, qf))
        }
        ObjKind::Var {
            is_field: true, ..
        } => format!("field {} {}", data.name, type_string(store, data.ty, qf)),
        ObjKind::Var { .. } => {
            format!("var {} {}", qualified, type_string(store, data.ty, qf))
        }
        ObjKind::Const => {
            format!("const {} {}", qualified, type_string(store, data.ty, qf))
        }
        ObjKind::PkgName { imported } => {
            if imported.as_ref() == data.name.as_str() {
                format!("package {}", data.name)
            } else {
                format!("package {} ({:?})", data.name, imported.as_ref())
            }
        }
        ObjKind::Builtin => format!("builtin {}", data.name),
        ObjKind::Label => format!("label {}", data.name),
    }
}

fn qualified_name(data: &ObjectData, qf: Qualifier<'_>) -> String {
    match data.pkg.as_deref().map(qf) {
        Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, data.name),
        _ => data.name.to_string(),
    }
}
