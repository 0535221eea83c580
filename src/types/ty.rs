//! Types and the view-wide store.
//!
//! All types and objects of a view live in one append-only [`Store`]
//! behind `Arc` + interior locking: packages reference each other's types
//! freely, and replacing a package never invalidates handles held by its
//! dependents. The store is discarded wholesale when the view is rebuilt.

use std::collections::VecDeque;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::object::{ObjId, ObjKind, ObjectData};

/// A handle to a type in the view's store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct TypeId(pub u32);

/// The invalid type, used for unresolved expressions.
pub const INVALID: TypeId = TypeId(0);

/// Predeclared basic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basic {
    Bool,
    Int,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Byte,
    Rune,
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedRune,
    UntypedNil,
}

impl Basic {
    pub const ALL: [Basic; 15] = [
        Basic::Bool,
        Basic::Int,
        Basic::Int32,
        Basic::Int64,
        Basic::Float32,
        Basic::Float64,
        Basic::String,
        Basic::Byte,
        Basic::Rune,
        Basic::UntypedBool,
        Basic::UntypedInt,
        Basic::UntypedFloat,
        Basic::UntypedString,
        Basic::UntypedRune,
        Basic::UntypedNil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Basic::Bool => "bool",
            Basic::Int => "int",
            Basic::Int32 => "int32",
            Basic::Int64 => "int64",
            Basic::Float32 => "float32",
            Basic::Float64 => "float64",
            Basic::String => "string",
            Basic::Byte => "byte",
            Basic::Rune => "rune",
            Basic::UntypedBool => "untyped bool",
            Basic::UntypedInt => "untyped int",
            Basic::UntypedFloat => "untyped float",
            Basic::UntypedString => "untyped string",
            Basic::UntypedRune => "untyped rune",
            Basic::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            Basic::UntypedBool
                | Basic::UntypedInt
                | Basic::UntypedFloat
                | Basic::UntypedString
                | Basic::UntypedRune
                | Basic::UntypedNil
        )
    }

    /// The typed kind an untyped constant defaults to.
    pub fn default_kind(self) -> Basic {
        match self {
            Basic::UntypedBool => Basic::Bool,
            Basic::UntypedInt => Basic::Int,
            Basic::UntypedFloat => Basic::Float64,
            Basic::UntypedString => Basic::String,
            Basic::UntypedRune => Basic::Rune,
            other => other,
        }
    }
}

/// One type in the store.
#[derive(Debug, Clone)]
pub enum TypeData {
    Invalid,
    Basic(Basic),
    Named {
        /// The defining `TypeName` object.
        obj: ObjId,
        /// Always a non-named type once declaration fixup has run.
        underlying: TypeId,
        /// Declared methods, in declaration order.
        methods: Vec<ObjId>,
    },
    Pointer {
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Struct {
        /// Field `Var` objects, in declaration order.
        fields: Vec<ObjId>,
        /// Raw tag literals, parallel to `fields`.
        tags: Vec<Option<SmolStr>>,
    },
    Interface {
        /// Explicitly declared methods.
        methods: Vec<ObjId>,
        /// Embedded interface types.
        embeddeds: Vec<TypeId>,
    },
    Signature {
        recv: Option<TypeId>,
        /// Parameter `Var` objects.
        params: Vec<ObjId>,
        results: Vec<TypeId>,
    },
}

/// The view-wide type and object store.
#[derive(Default)]
pub struct Store {
    types: RwLock<Vec<TypeData>>,
    objects: RwLock<Vec<ObjectData>>,
}

impl Store {
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut types = store.types.write();
            types.push(TypeData::Invalid); // INVALID = TypeId(0)
            for basic in Basic::ALL {
                types.push(TypeData::Basic(basic));
            }
        }
        store
    }

    /// The fixed id of a basic type.
    pub fn basic(&self, basic: Basic) -> TypeId {
        let idx = Basic::ALL.iter().position(|b| *b == basic).unwrap_or(0);
        TypeId(1 + idx as u32)
    }

    // ------------------------------------------------------------------
    // Allocation and mutation (used during checking only)
    // ------------------------------------------------------------------

    pub fn alloc_type(&self, data: TypeData) -> TypeId {
        let mut types = self.types.write();
        let id = TypeId(types.len() as u32);
        types.push(data);
        id
    }

    pub fn alloc_object(&self, data: ObjectData) -> ObjId {
        let mut objects = self.objects.write();
        let id = ObjId(objects.len() as u32);
        objects.push(data);
        id
    }

    pub fn type_data(&self, id: TypeId) -> TypeData {
        self.types
            .read()
            .get(id.0 as usize)
            .cloned()
            .unwrap_or(TypeData::Invalid)
    }

    pub fn object(&self, id: ObjId) -> ObjectData {
        self.objects
            .read()
            .get(id.0 as usize)
            .cloned()
            .unwrap_or_else(|| ObjectData {
                name: SmolStr::default(),
                kind: ObjKind::Builtin,
                pkg: None,
                file: None,
                range: None,
                ty: INVALID,
                doc: None,
            })
    }

    pub fn set_underlying(&self, named: TypeId, underlying: TypeId) {
        let mut types = self.types.write();
        if let Some(TypeData::Named {
            underlying: slot, ..
        }) = types.get_mut(named.0 as usize)
        {
            *slot = underlying;
        }
    }

    pub fn add_named_method(&self, named: TypeId, method: ObjId) {
        let mut types = self.types.write();
        if let Some(TypeData::Named { methods, .. }) = types.get_mut(named.0 as usize) {
            methods.push(method);
        }
    }

    pub fn set_interface(&self, iface: TypeId, methods: Vec<ObjId>, embeddeds: Vec<TypeId>) {
        let mut types = self.types.write();
        if let Some(slot) = types.get_mut(iface.0 as usize) {
            *slot = TypeData::Interface { methods, embeddeds };
        }
    }

    pub fn set_obj_ty(&self, obj: ObjId, ty: TypeId) {
        let mut objects = self.objects.write();
        if let Some(data) = objects.get_mut(obj.0 as usize) {
            data.ty = ty;
        }
    }

    pub fn set_obj_kind(&self, obj: ObjId, kind: ObjKind) {
        let mut objects = self.objects.write();
        if let Some(data) = objects.get_mut(obj.0 as usize) {
            data.kind = kind;
        }
    }

    // ------------------------------------------------------------------
    // Structure queries
    // ------------------------------------------------------------------

    /// The underlying type: resolves one level of `Named`.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        match self.type_data(id) {
            TypeData::Named { underlying, .. } => underlying,
            _ => id,
        }
    }

    /// Strip one pointer, if present.
    pub fn deref(&self, id: TypeId) -> TypeId {
        match self.type_data(id) {
            TypeData::Pointer { elem } => elem,
            _ => id,
        }
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.type_data(self.underlying(id)), TypeData::Interface { .. })
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.type_data(id), TypeData::Pointer { .. })
    }

    /// The `TypeName` object of a named type (through one pointer).
    pub fn named_obj(&self, id: TypeId) -> Option<ObjId> {
        match self.type_data(self.deref(id)) {
            TypeData::Named { obj, .. } => Some(obj),
            _ => None,
        }
    }

    /// All methods of an interface, embedded interfaces flattened.
    pub fn interface_methods(&self, id: TypeId) -> Vec<ObjId> {
        let mut out: Vec<ObjId> = Vec::new();
        let mut names: FxHashSet<SmolStr> = FxHashSet::default();
        let mut seen: FxHashSet<TypeId> = FxHashSet::default();
        let mut queue = VecDeque::from([self.underlying(id)]);
        while let Some(t) = queue.pop_front() {
            if !seen.insert(t) {
                continue;
            }
            if let TypeData::Interface { methods, embeddeds } = self.type_data(t) {
                for m in methods {
                    let name = self.object(m).name;
                    if names.insert(name) {
                        out.push(m);
                    }
                }
                for e in embeddeds {
                    queue.push_back(self.underlying(e));
                }
            }
        }
        out.sort_by_key(|m| self.object(*m).name);
        out
    }

    /// The method set of `t`, promoted methods included, sorted by name.
    ///
    /// For a pointer type the set includes pointer-receiver methods of the
    /// pointed-to named type; for a value type it does not.
    pub fn method_set(&self, t: TypeId) -> Vec<(SmolStr, ObjId)> {
        struct Candidate {
            depth: u32,
            obj: ObjId,
            ambiguous: bool,
        }
        let mut found: FxHashMap<SmolStr, Candidate> = FxHashMap::default();
        let include_ptr = self.is_pointer(t);
        let mut seen: FxHashSet<(TypeId, bool)> = FxHashSet::default();
        let mut queue = VecDeque::from([(self.deref(t), include_ptr, 0u32)]);

        while let Some((base, with_ptr, depth)) = queue.pop_front() {
            if !seen.insert((base, with_ptr)) {
                continue;
            }

            let mut add = |name: SmolStr, obj: ObjId, depth: u32| {
                use std::collections::hash_map::Entry;
                match found.entry(name) {
                    Entry::Occupied(mut e) => {
                        let c = e.get_mut();
                        // BFS order guarantees we never see a shallower
                        // candidate after a deeper one.
                        if c.depth == depth && c.obj != obj {
                            c.ambiguous = true;
                        }
                    }
                    Entry::Vacant(e) => {
                        e.insert(Candidate {
                            depth,
                            obj,
                            ambiguous: false,
                        });
                    }
                }
            };

            if let TypeData::Named { methods, .. } = self.type_data(base) {
                for m in methods {
                    let data = self.object(m);
                    let ptr_recv = match &data.kind {
                        ObjKind::Func { recv: Some(r) } => self.is_pointer(*r),
                        _ => false,
                    };
                    if !ptr_recv || with_ptr {
                        add(data.name, m, depth);
                    }
                }
            }

            let under = self.underlying(base);
            match self.type_data(under) {
                TypeData::Interface { .. } => {
                    for m in self.interface_methods(under) {
                        add(self.object(m).name, m, depth);
                    }
                }
                TypeData::Struct { fields, .. } => {
                    for f in fields {
                        let data = self.object(f);
                        if let ObjKind::Var { embedded: true, .. } = data.kind {
                            let fptr = self.is_pointer(data.ty);
                            queue.push_back((
                                self.deref(data.ty),
                                with_ptr || fptr,
                                depth + 1,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut out: Vec<(SmolStr, ObjId)> = found
            .into_iter()
            .filter(|(_, c)| !c.ambiguous)
            .map(|(name, c)| (name, c.obj))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Look up a method by name in the full (pointer) method set of `t`.
    pub fn lookup_method(&self, t: TypeId, name: &str) -> Option<ObjId> {
        let full = if self.is_pointer(t) || self.is_interface(t) {
            self.method_set(t)
        } else {
            // Selector lookup sees the pointer method set of an
            // addressable value, so fake a pointer here.
            let ptr = self.alloc_type(TypeData::Pointer { elem: t });
            self.method_set(ptr)
        };
        full.into_iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, m)| m)
    }

    /// Look up a struct field by name, promoted fields included.
    pub fn lookup_field(&self, t: TypeId, name: &str) -> Option<ObjId> {
        let mut seen: FxHashSet<TypeId> = FxHashSet::default();
        let mut queue = VecDeque::from([self.deref(t)]);
        while let Some(base) = queue.pop_front() {
            if !seen.insert(base) {
                continue;
            }
            if let TypeData::Struct { fields, .. } = self.type_data(self.underlying(base)) {
                for f in &fields {
                    if self.object(*f).name.as_str() == name {
                        return Some(*f);
                    }
                }
                for f in fields {
                    let data = self.object(f);
                    if let ObjKind::Var { embedded: true, .. } = data.kind {
                        queue.push_back(self.deref(data.ty));
                    }
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Identity and assignability
    // ------------------------------------------------------------------

    /// Structural type identity. Named types are identical only to
    /// themselves, which also breaks declaration cycles.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.type_data(a), self.type_data(b)) {
            (TypeData::Basic(x), TypeData::Basic(y)) => x == y,
            (TypeData::Named { obj: x, .. }, TypeData::Named { obj: y, .. }) => x == y,
            (TypeData::Pointer { elem: x }, TypeData::Pointer { elem: y })
            | (TypeData::Slice { elem: x }, TypeData::Slice { elem: y }) => {
                self.identical(x, y)
            }
            (
                TypeData::Map { key: ka, value: va },
                TypeData::Map { key: kb, value: vb },
            ) => self.identical(ka, kb) && self.identical(va, vb),
            (TypeData::Struct { fields: fa, .. }, TypeData::Struct { fields: fb, .. }) => {
                fa.len() == fb.len()
                    && fa.iter().zip(&fb).all(|(x, y)| {
                        let (dx, dy) = (self.object(*x), self.object(*y));
                        dx.name == dy.name
                            && dx.kind == dy.kind
                            && self.identical(dx.ty, dy.ty)
                    })
            }
            (TypeData::Interface { .. }, TypeData::Interface { .. }) => {
                let (ma, mb) = (self.interface_methods(a), self.interface_methods(b));
                ma.len() == mb.len()
                    && ma.iter().zip(&mb).all(|(x, y)| {
                        let (dx, dy) = (self.object(*x), self.object(*y));
                        dx.name == dy.name && self.identical_signature(dx.ty, dy.ty)
                    })
            }
            (TypeData::Signature { .. }, TypeData::Signature { .. }) => {
                self.identical_signature(a, b)
            }
            _ => false,
        }
    }

    /// Signature identity, ignoring receivers and parameter names.
    fn identical_signature(&self, a: TypeId, b: TypeId) -> bool {
        match (self.type_data(a), self.type_data(b)) {
            (
                TypeData::Signature {
                    params: pa,
                    results: ra,
                    ..
                },
                TypeData::Signature {
                    params: pb,
                    results: rb,
                    ..
                },
            ) => {
                pa.len() == pb.len()
                    && ra.len() == rb.len()
                    && pa
                        .iter()
                        .zip(&pb)
                        .all(|(x, y)| self.identical(self.object(*x).ty, self.object(*y).ty))
                    && ra.iter().zip(&rb).all(|(x, y)| self.identical(*x, *y))
            }
            _ => false,
        }
    }

    /// Whether the method set of `s` satisfies interface `iface`.
    pub fn implements(&self, s: TypeId, iface: TypeId) -> bool {
        let want = self.interface_methods(iface);
        if want.is_empty() {
            return true;
        }
        let have = self.method_set(s);
        want.iter().all(|w| {
            let wd = self.object(*w);
            have.iter().any(|(name, m)| {
                *name == wd.name && self.identical_signature(self.object(*m).ty, wd.ty)
            })
        })
    }

    /// Assignability: `s` usable where `t` is expected.
    pub fn assignable_to(&self, s: TypeId, t: TypeId) -> bool {
        if self.identical(s, t) {
            return true;
        }
        if s == INVALID || t == INVALID {
            return false;
        }

        let (us, ut) = (self.underlying(s), self.underlying(t));

        // Interface satisfaction.
        if matches!(self.type_data(ut), TypeData::Interface { .. }) {
            return self.implements(s, ut);
        }

        // Untyped constants assign to their default class.
        if let TypeData::Basic(bs) = self.type_data(us) {
            if bs.is_untyped() {
                if bs == Basic::UntypedNil {
                    return matches!(
                        self.type_data(ut),
                        TypeData::Pointer { .. }
                            | TypeData::Slice { .. }
                            | TypeData::Map { .. }
                            | TypeData::Signature { .. }
                            | TypeData::Interface { .. }
                    );
                }
                if let TypeData::Basic(bt) = self.type_data(ut) {
                    return bs.default_kind() == bt.default_kind()
                        || matches!(
                            (bs, bt),
                            (Basic::UntypedInt, Basic::Float32 | Basic::Float64)
                        );
                }
                return false;
            }
        }

        // Identical underlying types where at least one side is unnamed.
        let named_s = matches!(self.type_data(s), TypeData::Named { .. });
        let named_t = matches!(self.type_data(t), TypeData::Named { .. });
        if (!named_s || !named_t) && self.identical(us, ut) {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(store: &Store, name: &str, underlying: TypeId) -> TypeId {
        let obj = store.alloc_object(ObjectData {
            name: SmolStr::new(name),
            kind: ObjKind::TypeName { alias: false },
            pkg: Some("p".into()),
            file: None,
            range: None,
            ty: INVALID,
            doc: None,
        });
        let id = store.alloc_type(TypeData::Named {
            obj,
            underlying,
            methods: Vec::new(),
        });
        store.set_obj_ty(obj, id);
        id
    }

    fn method(store: &Store, recv: TypeId, name: &str, results: Vec<TypeId>) -> ObjId {
        let sig = store.alloc_type(TypeData::Signature {
            recv: Some(recv),
            params: Vec::new(),
            results,
        });
        store.alloc_object(ObjectData {
            name: SmolStr::new(name),
            kind: ObjKind::Func { recv: Some(recv) },
            pkg: Some("p".into()),
            file: None,
            range: None,
            ty: sig,
            doc: None,
        })
    }

    #[test]
    fn test_basic_identity() {
        let store = Store::new();
        let int = store.basic(Basic::Int);
        let string = store.basic(Basic::String);
        assert!(store.identical(int, int));
        assert!(!store.identical(int, string));
    }

    #[test]
    fn test_named_types_not_identical() {
        let store = Store::new();
        let int = store.basic(Basic::Int);
        let a = named(&store, "A", int);
        let b = named(&store, "B", int);
        assert!(!store.identical(a, b));
        // but assignable: identical underlying, mixed named/unnamed
        assert!(store.assignable_to(a, int));
        assert!(store.assignable_to(int, a));
        // both named with different names: not assignable
        assert!(!store.assignable_to(a, b));
    }

    #[test]
    fn test_interface_satisfaction() {
        let store = Store::new();
        let string = store.basic(Basic::String);
        let struct_ty = store.alloc_type(TypeData::Struct { fields: Vec::new(), tags: Vec::new() });
        let t = named(&store, "T", struct_ty);

        let iface = store.alloc_type(TypeData::Interface {
            methods: Vec::new(),
            embeddeds: Vec::new(),
        });
        let m = method(&store, iface, "String", vec![string]);
        store.set_interface(iface, vec![m], Vec::new());
        let stringer = named(&store, "Stringer", iface);

        // no methods yet
        assert!(!store.assignable_to(t, stringer));

        // value receiver method String() string
        let tm = method(&store, t, "String", vec![string]);
        store.add_named_method(t, tm);
        assert!(store.assignable_to(t, stringer));

        // pointer method set contains it too
        let ptr = store.alloc_type(TypeData::Pointer { elem: t });
        assert!(store.assignable_to(ptr, stringer));
    }

    #[test]
    fn test_pointer_receiver_excluded_from_value_set() {
        let store = Store::new();
        let struct_ty = store.alloc_type(TypeData::Struct { fields: Vec::new(), tags: Vec::new() });
        let t = named(&store, "T", struct_ty);
        let ptr = store.alloc_type(TypeData::Pointer { elem: t });

        let m = method(&store, ptr, "Close", Vec::new());
        store.add_named_method(t, m);

        let value_set = store.method_set(t);
        assert!(value_set.is_empty());
        let ptr_set = store.method_set(ptr);
        assert_eq!(ptr_set.len(), 1);
    }

    #[test]
    fn test_promoted_methods_via_embedding() {
        let store = Store::new();
        let base_struct = store.alloc_type(TypeData::Struct {
            fields: Vec::new(),
            tags: Vec::new(),
        });
        let base = named(&store, "Base", base_struct);
        let m = method(&store, base, "Name", vec![store.basic(Basic::String)]);
        store.add_named_method(base, m);

        // type Outer struct { Base }
        let field = store.alloc_object(ObjectData {
            name: SmolStr::new("Base"),
            kind: ObjKind::Var {
                is_field: true,
                embedded: true,
            },
            pkg: Some("p".into()),
            file: None,
            range: None,
            ty: base,
            doc: None,
        });
        let outer_struct = store.alloc_type(TypeData::Struct {
            fields: vec![field],
            tags: vec![None],
        });
        let outer = named(&store, "Outer", outer_struct);

        let set = store.method_set(outer);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].0, "Name");
    }

    #[test]
    fn test_untyped_assignability() {
        let store = Store::new();
        let untyped_int = store.basic(Basic::UntypedInt);
        let int = store.basic(Basic::Int);
        let nil = store.basic(Basic::UntypedNil);
        let ptr = store.alloc_type(TypeData::Pointer {
            elem: store.basic(Basic::Int),
        });
        assert!(store.assignable_to(untyped_int, int));
        assert!(store.assignable_to(nil, ptr));
        assert!(!store.assignable_to(nil, int));
    }
}
