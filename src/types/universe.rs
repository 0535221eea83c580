//! The universe scope: predeclared types, constants, and functions.
//!
//! Universe objects have no owning package and no position; the resolver
//! recognizes them by the invalid position and redirects definition
//! lookups into the loaded `builtin` package.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::object::{ObjId, ObjKind, ObjectData};
use super::ty::{Basic, Store, TypeData, TypeId, INVALID};

/// The predeclared scope, shared by every package of a view.
pub struct Universe {
    pub scope: FxHashMap<SmolStr, ObjId>,
    /// The predeclared `error` interface type.
    pub error_type: TypeId,
}

impl Universe {
    pub fn new(store: &Store) -> Self {
        let mut scope = FxHashMap::default();

        let mut builtin = |name: &str, kind: ObjKind, ty: TypeId| -> ObjId {
            let obj = store.alloc_object(ObjectData {
                name: SmolStr::new(name),
                kind,
                pkg: None,
                file: None,
                range: None,
                ty,
                doc: None,
            });
            scope.insert(SmolStr::new(name), obj);
            obj
        };

        // Predeclared type names. Their type is the basic type itself.
        for basic in [
            Basic::Bool,
            Basic::Int,
            Basic::Int32,
            Basic::Int64,
            Basic::Float32,
            Basic::Float64,
            Basic::String,
            Basic::Byte,
            Basic::Rune,
        ] {
            builtin(
                basic.name(),
                ObjKind::TypeName { alias: false },
                store.basic(basic),
            );
        }

        // error: interface { Error() string }
        let iface = store.alloc_type(TypeData::Interface {
            methods: Vec::new(),
            embeddeds: Vec::new(),
        });
        let error_obj = builtin("error", ObjKind::TypeName { alias: false }, INVALID);
        let error_type = store.alloc_type(TypeData::Named {
            obj: error_obj,
            underlying: iface,
            methods: Vec::new(),
        });
        store.set_obj_ty(error_obj, error_type);
        let error_sig = store.alloc_type(TypeData::Signature {
            recv: Some(error_type),
            params: Vec::new(),
            results: vec![store.basic(Basic::String)],
        });
        let error_method = store.alloc_object(ObjectData {
            name: SmolStr::new("Error"),
            kind: ObjKind::Func {
                recv: Some(error_type),
            },
            pkg: None,
            file: None,
            range: None,
            ty: error_sig,
            doc: None,
        });
        store.set_interface(iface, vec![error_method], Vec::new());

        // Predeclared constants.
        builtin("true", ObjKind::Const, store.basic(Basic::UntypedBool));
        builtin("false", ObjKind::Const, store.basic(Basic::UntypedBool));
        builtin("iota", ObjKind::Const, store.basic(Basic::UntypedInt));
        builtin("nil", ObjKind::Const, store.basic(Basic::UntypedNil));

        // Builtin functions. Their "types" are synthesized per call site.
        for name in [
            "len", "cap", "make", "new", "append", "copy", "delete", "panic", "print",
            "println", "recover", "close",
        ] {
            builtin(name, ObjKind::Builtin, INVALID);
        }

        Self { scope, error_type }
    }

    pub fn lookup(&self, name: &str) -> Option<ObjId> {
        self.scope.get(name).copied()
    }
}
