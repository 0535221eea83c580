//! The type universe: objects, types, method sets, assignability, and the
//! package checker.
//!
//! Everything here is owned by a view-wide [`Store`]; packages carry
//! [`TypesInfo`] tables of [`ObjId`]/[`TypeId`] handles into it.

pub mod check;
pub mod display;
pub mod info;
pub mod object;
pub mod ty;
pub mod universe;

pub use check::{check_package, CheckResult};
pub use display::{empty_qualifier, full_qualifier, object_string, signature_suffix, type_string};
pub use info::{IdentEntry, PkgScope, TypesInfo};
pub use object::{ObjId, ObjKind, ObjectData};
pub use ty::{Basic, Store, TypeData, TypeId, INVALID};
pub use universe::Universe;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustc_hash::FxHashMap;
    use smol_str::SmolStr;

    use crate::base::{FileId, TextSize};
    use crate::syntax::parse_file;

    use super::*;

    fn check_src(src: &str) -> (Store, CheckResult) {
        let store = Store::new();
        let universe = Universe::new(&store);
        let (file, errors) = parse_file(FileId::new(0), src);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        let path: Arc<str> = "test/pkg".into();
        let name = SmolStr::new(file.package.name.as_str());
        let result = check_package(
            &store,
            &universe,
            &path,
            &name,
            &[file],
            &FxHashMap::default(),
        );
        (store, result)
    }

    fn offset_of(src: &str, needle: &str) -> TextSize {
        TextSize::from(src.find(needle).unwrap() as u32)
    }

    #[test]
    fn test_function_call_use_resolves_to_def() {
        let src = "package p; func A() int { return 0 }; func B() int { return A() }";
        let (_store, result) = check_src(src);
        let fid = FileId::new(0);

        let def = result
            .info
            .def_at(fid, offset_of(src, "A() int"))
            .expect("def of A");
        let use_pos = TextSize::from(src.rfind("A()").unwrap() as u32);
        let used = result.info.use_at(fid, use_pos).expect("use of A");
        assert_eq!(def, used);
    }

    #[test]
    fn test_method_selector_resolves() {
        let src = "package p; type T struct { N int }; func (t T) Get() int { return t.N }";
        let (store, result) = check_src(src);
        let fid = FileId::new(0);

        let field_def = result
            .info
            .def_at(fid, offset_of(src, "N int"))
            .expect("field def");
        let use_pos = TextSize::from(src.rfind(".N").unwrap() as u32 + 1);
        let field_use = result.info.use_at(fid, use_pos).expect("field use");
        assert_eq!(field_def, field_use);

        let data = store.object(field_use);
        assert!(matches!(
            data.kind,
            ObjKind::Var { is_field: true, .. }
        ));
    }

    #[test]
    fn test_embedded_field_is_def_not_use() {
        let src = "package p; type Base struct {}; type Outer struct { Base }";
        let (store, result) = check_src(src);
        let fid = FileId::new(0);

        let pos = TextSize::from(src.rfind("Base").unwrap() as u32);
        let def = result.info.def_at(fid, pos).expect("embedded field def");
        assert!(result.info.use_at(fid, pos).is_none());
        let data = store.object(def);
        assert!(matches!(
            data.kind,
            ObjKind::Var {
                is_field: true,
                embedded: true
            }
        ));
    }

    #[test]
    fn test_builtin_use_has_invalid_position() {
        let src = "package p; func f(s string) int { return len(s) }";
        let (store, result) = check_src(src);
        let fid = FileId::new(0);

        let obj = result
            .info
            .use_at(fid, offset_of(src, "len(s)"))
            .expect("use of len");
        let data = store.object(obj);
        assert!(data.is_builtin_pos());
        assert!(data.pkg.is_none());
    }

    #[test]
    fn test_source_interface_satisfaction() {
        let src = "package p; \
                   type Named interface { Name() string }; \
                   type User struct {}; \
                   func (u User) Name() string { return \"\" }";
        let (store, result) = check_src(src);
        let fid = FileId::new(0);

        let iface_obj = result
            .info
            .def_at(fid, offset_of(src, "Named interface"))
            .unwrap();
        let user_obj = result
            .info
            .def_at(fid, offset_of(src, "User struct"))
            .unwrap();
        let iface_ty = store.object(iface_obj).ty;
        let user_ty = store.object(user_obj).ty;

        assert!(store.is_interface(iface_ty));
        assert!(store.assignable_to(user_ty, iface_ty));
    }

    #[test]
    fn test_named_type_chain_underlying() {
        let src = "package p; type A B; type B struct { X int }";
        let (store, result) = check_src(src);
        let fid = FileId::new(0);

        let a = result.info.def_at(fid, offset_of(src, "A B")).unwrap();
        let a_ty = store.object(a).ty;
        assert!(matches!(
            store.type_data(store.underlying(a_ty)),
            TypeData::Struct { .. }
        ));
    }

    #[test]
    fn test_short_var_decl_defines_local() {
        let src = "package p; func f() int { x := 1; return x }";
        let (_store, result) = check_src(src);
        let fid = FileId::new(0);

        let def = result
            .info
            .def_at(fid, offset_of(src, "x :="))
            .expect("local def");
        let used = result
            .info
            .use_at(fid, offset_of(src, "x }"))
            .expect("local use");
        assert_eq!(def, used);
    }

    #[test]
    fn test_every_recorded_ident_is_inside_the_file() {
        let src = "package p; type T struct { N int }; func (t T) Get() int { return t.N }";
        let (_store, result) = check_src(src);
        let len = TextSize::of(src);
        for entry in result.info.defs.values().chain(result.info.uses.values()) {
            assert!(entry.range.end() <= len);
        }
    }
}
