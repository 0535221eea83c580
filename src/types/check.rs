//! The package checker.
//!
//! Checking runs in three passes over a package's files:
//!
//! 1. **Collect**: package-level declarations and per-file import scopes
//!    become objects; named types get their `Named` shell.
//! 2. **Resolve**: type expressions, struct/interface bodies, function
//!    signatures, and method attachment; named underlyings are fixed up
//!    until stable so forward references and chains work.
//! 3. **Bodies**: function bodies and package-level initializers are
//!    walked, recording every identifier resolution in `uses` and the
//!    type of every expression.
//!
//! The checker is resilient: unresolved names simply record nothing, so a
//! half-broken file still yields usable tables.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::FileId;
use crate::syntax::ast;

use super::info::{IdentEntry, PkgScope, TypesInfo};
use super::object::{ObjId, ObjKind, ObjectData};
use super::ty::{Basic, Store, TypeData, TypeId, INVALID};
use super::universe::Universe;

/// The result of checking one package.
pub struct CheckResult {
    pub info: TypesInfo,
    pub scope: PkgScope,
}

/// Type-check a package given the scopes of its direct imports.
pub fn check_package(
    store: &Store,
    universe: &Universe,
    pkg_path: &Arc<str>,
    pkg_name: &SmolStr,
    files: &[ast::File],
    imports: &FxHashMap<Arc<str>, Arc<PkgScope>>,
) -> CheckResult {
    let mut checker = Checker {
        store,
        universe,
        pkg_path: pkg_path.clone(),
        imports,
        info: TypesInfo::default(),
        pkg_scope: FxHashMap::default(),
        file_scopes: FxHashMap::default(),
        named_rhs: Vec::new(),
    };

    for file in files {
        checker.collect_file(file);
    }
    for file in files {
        checker.resolve_file(file);
    }
    checker.fixup_underlyings();
    for file in files {
        checker.check_bodies(file);
    }

    CheckResult {
        info: checker.info,
        scope: PkgScope {
            path: pkg_path.clone(),
            name: pkg_name.clone(),
            names: checker.pkg_scope,
        },
    }
}

struct Checker<'a> {
    store: &'a Store,
    universe: &'a Universe,
    pkg_path: Arc<str>,
    imports: &'a FxHashMap<Arc<str>, Arc<PkgScope>>,
    info: TypesInfo,
    pkg_scope: FxHashMap<SmolStr, ObjId>,
    /// Per-file import scopes: name → PkgName object.
    file_scopes: FxHashMap<FileId, FxHashMap<SmolStr, ObjId>>,
    /// Declared named types and their right-hand-side types, for the
    /// underlying fixup.
    named_rhs: Vec<(TypeId, TypeId)>,
}

type LocalScopes = Vec<FxHashMap<SmolStr, ObjId>>;

impl<'a> Checker<'a> {
    // ------------------------------------------------------------------
    // Pass 1: collect
    // ------------------------------------------------------------------

    fn collect_file(&mut self, file: &ast::File) {
        let fid = file.file_id;
        let mut file_scope = FxHashMap::default();

        for spec in &file.imports {
            let path: Arc<str> = spec.path.string_value().as_str().into();
            let imported_name = self
                .imports
                .get(&path)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| {
                    SmolStr::new(path.rsplit('/').next().unwrap_or(path.as_ref()))
                });
            let name = spec
                .alias
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or(imported_name);
            let range = spec
                .alias
                .as_ref()
                .map(|a| a.range)
                .unwrap_or(spec.path.range);
            let obj = self.store.alloc_object(ObjectData {
                name: name.clone(),
                kind: ObjKind::PkgName {
                    imported: path.clone(),
                },
                pkg: Some(self.pkg_path.clone()),
                file: Some(fid),
                range: Some(range),
                ty: INVALID,
                doc: None,
            });
            if let Some(alias) = &spec.alias {
                self.info.record_def(
                    fid,
                    IdentEntry {
                        name: alias.name.clone(),
                        range: alias.range,
                        obj,
                    },
                );
            }
            file_scope.insert(name, obj);
        }
        self.file_scopes.insert(fid, file_scope);

        for decl in &file.decls {
            match decl {
                ast::Decl::Type(d) => {
                    for spec in &d.specs {
                        self.collect_type_spec(fid, spec);
                    }
                }
                ast::Decl::Value(d) => {
                    for spec in &d.specs {
                        for name in &spec.names {
                            let kind = match d.kind {
                                ast::ValueKind::Var => ObjKind::Var {
                                    is_field: false,
                                    embedded: false,
                                },
                                ast::ValueKind::Const => ObjKind::Const,
                            };
                            self.declare(fid, name, kind, INVALID, spec.doc.clone());
                        }
                    }
                }
                ast::Decl::Func(d) if d.recv.is_none() => {
                    self.declare(
                        fid,
                        &d.name,
                        ObjKind::Func { recv: None },
                        INVALID,
                        d.doc.clone(),
                    );
                }
                ast::Decl::Func(_) => {
                    // Methods are attached during signature resolution.
                }
            }
        }
    }

    fn collect_type_spec(&mut self, fid: FileId, spec: &ast::TypeSpec) {
        let obj = self.declare(
            fid,
            &spec.name,
            ObjKind::TypeName { alias: spec.alias },
            INVALID,
            spec.doc.clone(),
        );
        if !spec.alias {
            let named = self.store.alloc_type(TypeData::Named {
                obj,
                underlying: INVALID,
                methods: Vec::new(),
            });
            self.store.set_obj_ty(obj, named);
        }
    }

    fn declare(
        &mut self,
        fid: FileId,
        name: &ast::Ident,
        kind: ObjKind,
        ty: TypeId,
        doc: Option<String>,
    ) -> ObjId {
        let obj = self.store.alloc_object(ObjectData {
            name: name.name.clone(),
            kind,
            pkg: Some(self.pkg_path.clone()),
            file: Some(fid),
            range: Some(name.range),
            ty,
            doc,
        });
        self.info.record_def(
            fid,
            IdentEntry {
                name: name.name.clone(),
                range: name.range,
                obj,
            },
        );
        if name.name != "_" && !name.name.is_empty() {
            self.pkg_scope.insert(name.name.clone(), obj);
        }
        obj
    }

    // ------------------------------------------------------------------
    // Pass 2: resolve declarations
    // ------------------------------------------------------------------

    fn resolve_file(&mut self, file: &ast::File) {
        let fid = file.file_id;
        for decl in &file.decls {
            match decl {
                ast::Decl::Type(d) => {
                    for spec in &d.specs {
                        let Some(obj) = self.info.def_at(fid, spec.name.range.start()) else {
                            continue;
                        };
                        if spec.alias {
                            let rhs = self.resolve_type_expr(fid, &spec.ty, None);
                            self.store.set_obj_ty(obj, rhs);
                        } else {
                            let named = self.store.object(obj).ty;
                            let rhs = self.resolve_type_expr(fid, &spec.ty, Some(named));
                            self.named_rhs.push((named, rhs));
                        }
                    }
                }
                ast::Decl::Value(d) => {
                    for spec in &d.specs {
                        if let Some(ty) = &spec.ty {
                            let t = self.resolve_type_expr(fid, ty, None);
                            for name in &spec.names {
                                if let Some(obj) = self.info.def_at(fid, name.range.start()) {
                                    self.store.set_obj_ty(obj, t);
                                }
                            }
                        }
                    }
                }
                ast::Decl::Func(d) => self.resolve_func_decl(fid, d),
            }
        }
    }

    fn resolve_func_decl(&mut self, fid: FileId, d: &ast::FuncDecl) {
        // Receiver first, so methods land on their named type.
        let mut recv_ty = None;
        let mut recv_obj = None;
        if let Some(recv) = &d.recv {
            let t = self.resolve_type_expr(fid, &recv.ty, None);
            recv_ty = Some(t);
            if let Some(name) = recv.names.first() {
                let obj = self.store.alloc_object(ObjectData {
                    name: name.name.clone(),
                    kind: ObjKind::Var {
                        is_field: false,
                        embedded: false,
                    },
                    pkg: Some(self.pkg_path.clone()),
                    file: Some(fid),
                    range: Some(name.range),
                    ty: t,
                    doc: None,
                });
                self.info.record_def(
                    fid,
                    IdentEntry {
                        name: name.name.clone(),
                        range: name.range,
                        obj,
                    },
                );
                recv_obj = Some(obj);
            }
        }

        let params = self.resolve_fields(fid, &d.params, true);
        let results: Vec<TypeId> = d
            .results
            .iter()
            .map(|t| self.resolve_type_expr(fid, t, None))
            .collect();
        let sig = self.store.alloc_type(TypeData::Signature {
            recv: recv_ty,
            params: params.clone(),
            results,
        });

        if let Some(recv_ty) = recv_ty {
            // Method: create the object now and attach it.
            let obj = self.store.alloc_object(ObjectData {
                name: d.name.name.clone(),
                kind: ObjKind::Func {
                    recv: Some(recv_ty),
                },
                pkg: Some(self.pkg_path.clone()),
                file: Some(fid),
                range: Some(d.name.range),
                ty: sig,
                doc: d.doc.clone(),
            });
            self.info.record_def(
                fid,
                IdentEntry {
                    name: d.name.name.clone(),
                    range: d.name.range,
                    obj,
                },
            );
            let base = self.store.deref(recv_ty);
            if matches!(self.store.type_data(base), TypeData::Named { .. }) {
                self.store.add_named_method(base, obj);
            }
        } else if let Some(obj) = self.info.def_at(fid, d.name.range.start()) {
            self.store.set_obj_ty(obj, sig);
        }

        let _ = recv_obj;
    }

    /// Resolve a field list, creating (and recording) parameter objects.
    fn resolve_fields(
        &mut self,
        fid: FileId,
        fields: &[ast::Field],
        record_defs: bool,
    ) -> Vec<ObjId> {
        let mut out = Vec::new();
        for field in fields {
            let t = self.resolve_type_expr(fid, &field.ty, None);
            if field.names.is_empty() {
                out.push(self.store.alloc_object(ObjectData {
                    name: SmolStr::default(),
                    kind: ObjKind::Var {
                        is_field: false,
                        embedded: false,
                    },
                    pkg: Some(self.pkg_path.clone()),
                    file: Some(fid),
                    range: Some(field.range),
                    ty: t,
                    doc: None,
                }));
            } else {
                for name in &field.names {
                    let obj = self.store.alloc_object(ObjectData {
                        name: name.name.clone(),
                        kind: ObjKind::Var {
                            is_field: false,
                            embedded: false,
                        },
                        pkg: Some(self.pkg_path.clone()),
                        file: Some(fid),
                        range: Some(name.range),
                        ty: t,
                        doc: None,
                    });
                    if record_defs && name.name != "_" {
                        self.info.record_def(
                            fid,
                            IdentEntry {
                                name: name.name.clone(),
                                range: name.range,
                                obj,
                            },
                        );
                    }
                    out.push(obj);
                }
            }
        }
        out
    }

    /// Resolve a type expression, recording uses for every identifier in
    /// it. `self_ty` is the enclosing named type for interface literals.
    fn resolve_type_expr(
        &mut self,
        fid: FileId,
        ty: &ast::TypeExpr,
        self_ty: Option<TypeId>,
    ) -> TypeId {
        match ty {
            ast::TypeExpr::Path(path) => self.resolve_type_path(fid, path),
            ast::TypeExpr::Pointer { elem, .. } => {
                let elem = self.resolve_type_expr(fid, elem, None);
                self.store.alloc_type(TypeData::Pointer { elem })
            }
            ast::TypeExpr::Slice { elem, .. } => {
                let elem = self.resolve_type_expr(fid, elem, None);
                self.store.alloc_type(TypeData::Slice { elem })
            }
            ast::TypeExpr::Map { key, value, .. } => {
                let key = self.resolve_type_expr(fid, key, None);
                let value = self.resolve_type_expr(fid, value, None);
                self.store.alloc_type(TypeData::Map { key, value })
            }
            ast::TypeExpr::Struct { fields, .. } => self.resolve_struct(fid, fields),
            ast::TypeExpr::Interface { elems, .. } => {
                self.resolve_interface(fid, elems, self_ty)
            }
            ast::TypeExpr::Func {
                params, results, ..
            } => {
                let params = self.resolve_fields(fid, params, false);
                let results = results
                    .iter()
                    .map(|t| self.resolve_type_expr(fid, t, None))
                    .collect();
                self.store.alloc_type(TypeData::Signature {
                    recv: None,
                    params,
                    results,
                })
            }
        }
    }

    fn resolve_struct(&mut self, fid: FileId, fields: &[ast::Field]) -> TypeId {
        let mut field_objs = Vec::new();
        let mut tags = Vec::new();
        for field in fields {
            let tag = field.tag.as_ref().map(|t| t.string_value());
            if field.is_embedded() {
                // The field name is the type name; the ident defines the
                // implicit field rather than using the type, so resolve
                // without recording a use for it.
                let t = match embedded_path(&field.ty) {
                    Some((path, is_ptr)) => {
                        let base = self.resolve_type_path_inner(fid, path, false);
                        if is_ptr {
                            self.store.alloc_type(TypeData::Pointer { elem: base })
                        } else {
                            base
                        }
                    }
                    None => self.resolve_type_expr(fid, &field.ty, None),
                };
                let name_ident = embedded_name(&field.ty);
                let Some(name_ident) = name_ident else {
                    continue;
                };
                let obj = self.store.alloc_object(ObjectData {
                    name: name_ident.name.clone(),
                    kind: ObjKind::Var {
                        is_field: true,
                        embedded: true,
                    },
                    pkg: Some(self.pkg_path.clone()),
                    file: Some(fid),
                    range: Some(name_ident.range),
                    ty: t,
                    doc: field.doc.clone(),
                });
                self.info.record_def(
                    fid,
                    IdentEntry {
                        name: name_ident.name.clone(),
                        range: name_ident.range,
                        obj,
                    },
                );
                field_objs.push(obj);
                tags.push(tag);
            } else {
                let t = self.resolve_type_expr(fid, &field.ty, None);
                for name in &field.names {
                    let obj = self.store.alloc_object(ObjectData {
                        name: name.name.clone(),
                        kind: ObjKind::Var {
                            is_field: true,
                            embedded: false,
                        },
                        pkg: Some(self.pkg_path.clone()),
                        file: Some(fid),
                        range: Some(name.range),
                        ty: t,
                        doc: field.doc.clone(),
                    });
                    self.info.record_def(
                        fid,
                        IdentEntry {
                            name: name.name.clone(),
                            range: name.range,
                            obj,
                        },
                    );
                    field_objs.push(obj);
                    tags.push(tag.clone());
                }
            }
        }
        self.store.alloc_type(TypeData::Struct {
            fields: field_objs,
            tags,
        })
    }

    fn resolve_interface(
        &mut self,
        fid: FileId,
        elems: &[ast::InterfaceElem],
        self_ty: Option<TypeId>,
    ) -> TypeId {
        let iface = self.store.alloc_type(TypeData::Interface {
            methods: Vec::new(),
            embeddeds: Vec::new(),
        });
        let recv = self_ty.unwrap_or(iface);

        let mut methods = Vec::new();
        let mut embeddeds = Vec::new();
        for elem in elems {
            match elem {
                ast::InterfaceElem::Method {
                    doc,
                    name,
                    params,
                    results,
                    ..
                } => {
                    let params = self.resolve_fields(fid, params, false);
                    let results = results
                        .iter()
                        .map(|t| self.resolve_type_expr(fid, t, None))
                        .collect();
                    let sig = self.store.alloc_type(TypeData::Signature {
                        recv: Some(recv),
                        params,
                        results,
                    });
                    let obj = self.store.alloc_object(ObjectData {
                        name: name.name.clone(),
                        kind: ObjKind::Func { recv: Some(recv) },
                        pkg: Some(self.pkg_path.clone()),
                        file: Some(fid),
                        range: Some(name.range),
                        ty: sig,
                        doc: doc.clone(),
                    });
                    self.info.record_def(
                        fid,
                        IdentEntry {
                            name: name.name.clone(),
                            range: name.range,
                            obj,
                        },
                    );
                    methods.push(obj);
                }
                ast::InterfaceElem::Embedded(path) => {
                    let t = self.resolve_type_path(fid, path);
                    if t != INVALID {
                        embeddeds.push(t);
                    }
                }
            }
        }
        self.store.set_interface(iface, methods, embeddeds);
        iface
    }

    fn resolve_type_path(&mut self, fid: FileId, path: &ast::TypePath) -> TypeId {
        self.resolve_type_path_inner(fid, path, true)
    }

    fn resolve_type_path_inner(
        &mut self,
        fid: FileId,
        path: &ast::TypePath,
        record_name_use: bool,
    ) -> TypeId {
        if let Some(qualifier) = &path.qualifier {
            let Some(pkg_obj) = self.lookup_file_scope(fid, &qualifier.name) else {
                return INVALID;
            };
            self.record_use(fid, qualifier, pkg_obj);
            let ObjKind::PkgName { imported } = self.store.object(pkg_obj).kind else {
                return INVALID;
            };
            let Some(scope) = self.imports.get(&imported) else {
                return INVALID;
            };
            let Some(obj) = scope.lookup(&path.name.name) else {
                return INVALID;
            };
            if record_name_use {
                self.record_use(fid, &path.name, obj);
            }
            return self.type_of_type_name(obj);
        }

        let obj = self
            .pkg_scope
            .get(&path.name.name)
            .copied()
            .or_else(|| self.universe.lookup(&path.name.name));
        match obj {
            Some(obj) => {
                if record_name_use {
                    self.record_use(fid, &path.name, obj);
                }
                self.type_of_type_name(obj)
            }
            None => INVALID,
        }
    }

    fn type_of_type_name(&self, obj: ObjId) -> TypeId {
        let data = self.store.object(obj);
        if data.is_type_name() {
            data.ty
        } else {
            INVALID
        }
    }

    fn lookup_file_scope(&self, fid: FileId, name: &str) -> Option<ObjId> {
        self.file_scopes.get(&fid)?.get(name).copied()
    }

    fn record_use(&mut self, fid: FileId, ident: &ast::Ident, obj: ObjId) {
        if ident.name.is_empty() {
            return;
        }
        self.info.record_use(
            fid,
            IdentEntry {
                name: ident.name.clone(),
                range: ident.range,
                obj,
            },
        );
    }

    /// Iterate the underlying fixup to a fixed point so chains like
    /// `type A B; type B struct{...}` resolve regardless of order.
    /// Cyclic declarations keep an invalid underlying.
    fn fixup_underlyings(&mut self) {
        for _ in 0..self.named_rhs.len() + 1 {
            let mut changed = false;
            for (named, rhs) in &self.named_rhs {
                if self.store.underlying(*named) != INVALID {
                    continue;
                }
                let u = match self.store.type_data(*rhs) {
                    TypeData::Named { underlying, .. } => underlying,
                    _ => *rhs,
                };
                if u != INVALID && u != *named {
                    self.store.set_underlying(*named, u);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 3: bodies and initializers
    // ------------------------------------------------------------------

    fn check_bodies(&mut self, file: &ast::File) {
        let fid = file.file_id;
        for decl in &file.decls {
            match decl {
                ast::Decl::Value(d) => {
                    for spec in &d.specs {
                        let mut scopes: LocalScopes = Vec::new();
                        let mut value_types = Vec::new();
                        for value in &spec.values {
                            value_types.push(self.check_expr(fid, value, &mut scopes));
                        }
                        if spec.ty.is_none() {
                            for (i, name) in spec.names.iter().enumerate() {
                                if let Some(obj) =
                                    self.info.def_at(fid, name.range.start())
                                {
                                    let t = value_types
                                        .get(i)
                                        .copied()
                                        .unwrap_or(INVALID);
                                    self.store.set_obj_ty(obj, self.default_type(t));
                                }
                            }
                        }
                    }
                }
                ast::Decl::Func(d) => {
                    if let Some(body) = &d.body {
                        let mut scopes: LocalScopes = vec![FxHashMap::default()];
                        // Receiver and parameters are visible in the body.
                        if let Some(recv) = &d.recv {
                            if let Some(name) = recv.names.first() {
                                if let Some(obj) =
                                    self.info.def_at(fid, name.range.start())
                                {
                                    scopes[0].insert(name.name.clone(), obj);
                                }
                            }
                        }
                        for param in &d.params {
                            for name in &param.names {
                                if let Some(obj) =
                                    self.info.def_at(fid, name.range.start())
                                {
                                    scopes[0].insert(name.name.clone(), obj);
                                }
                            }
                        }
                        let mut labels = FxHashMap::default();
                        self.collect_labels(fid, body, &mut labels);
                        self.check_block(fid, body, &mut scopes, &labels);
                    }
                }
                ast::Decl::Type(_) => {}
            }
        }
    }

    fn collect_labels(
        &mut self,
        fid: FileId,
        block: &ast::Block,
        labels: &mut FxHashMap<SmolStr, ObjId>,
    ) {
        for stmt in &block.stmts {
            self.collect_labels_stmt(fid, stmt, labels);
        }
    }

    fn collect_labels_stmt(
        &mut self,
        fid: FileId,
        stmt: &ast::Stmt,
        labels: &mut FxHashMap<SmolStr, ObjId>,
    ) {
        match stmt {
            ast::Stmt::Labeled { label, stmt, .. } => {
                let obj = self.store.alloc_object(ObjectData {
                    name: label.name.clone(),
                    kind: ObjKind::Label,
                    pkg: Some(self.pkg_path.clone()),
                    file: Some(fid),
                    range: Some(label.range),
                    ty: INVALID,
                    doc: None,
                });
                self.info.record_def(
                    fid,
                    IdentEntry {
                        name: label.name.clone(),
                        range: label.range,
                        obj,
                    },
                );
                labels.insert(label.name.clone(), obj);
                self.collect_labels_stmt(fid, stmt, labels);
            }
            ast::Stmt::If { then, els, .. } => {
                self.collect_labels(fid, then, labels);
                if let Some(els) = els {
                    self.collect_labels_stmt(fid, els, labels);
                }
            }
            ast::Stmt::For { body, .. } => self.collect_labels(fid, body, labels),
            ast::Stmt::Block(b) => self.collect_labels(fid, b, labels),
            _ => {}
        }
    }

    fn check_block(
        &mut self,
        fid: FileId,
        block: &ast::Block,
        scopes: &mut LocalScopes,
        labels: &FxHashMap<SmolStr, ObjId>,
    ) {
        scopes.push(FxHashMap::default());
        for stmt in &block.stmts {
            self.check_stmt(fid, stmt, scopes, labels);
        }
        scopes.pop();
    }

    fn check_stmt(
        &mut self,
        fid: FileId,
        stmt: &ast::Stmt,
        scopes: &mut LocalScopes,
        labels: &FxHashMap<SmolStr, ObjId>,
    ) {
        match stmt {
            ast::Stmt::Expr(e) => {
                self.check_expr(fid, e, scopes);
            }
            ast::Stmt::Assign {
                lhs, rhs, define, ..
            } => {
                let rhs_types: Vec<TypeId> = rhs
                    .iter()
                    .map(|e| self.check_expr(fid, e, scopes))
                    .collect();
                if *define {
                    for (i, target) in lhs.iter().enumerate() {
                        let ast::Expr::Ident(name) = target else {
                            self.check_expr(fid, target, scopes);
                            continue;
                        };
                        if name.name == "_" {
                            continue;
                        }
                        if let Some(existing) = self.lookup_local(scopes, &name.name) {
                            // Redeclaration in a short var decl is a use.
                            self.record_use(fid, name, existing);
                            continue;
                        }
                        let t = rhs_types.get(i).copied().unwrap_or(INVALID);
                        let obj = self.store.alloc_object(ObjectData {
                            name: name.name.clone(),
                            kind: ObjKind::Var {
                                is_field: false,
                                embedded: false,
                            },
                            pkg: Some(self.pkg_path.clone()),
                            file: Some(fid),
                            range: Some(name.range),
                            ty: self.default_type(t),
                            doc: None,
                        });
                        self.info.record_def(
                            fid,
                            IdentEntry {
                                name: name.name.clone(),
                                range: name.range,
                                obj,
                            },
                        );
                        if let Some(scope) = scopes.last_mut() {
                            scope.insert(name.name.clone(), obj);
                        }
                    }
                } else {
                    for target in lhs {
                        self.check_expr(fid, target, scopes);
                    }
                }
            }
            ast::Stmt::Decl(d) => {
                for spec in &d.specs {
                    let declared = spec
                        .ty
                        .as_ref()
                        .map(|t| self.resolve_type_expr(fid, t, None));
                    let value_types: Vec<TypeId> = spec
                        .values
                        .iter()
                        .map(|e| self.check_expr(fid, e, scopes))
                        .collect();
                    for (i, name) in spec.names.iter().enumerate() {
                        if name.name == "_" {
                            continue;
                        }
                        let t = declared.unwrap_or_else(|| {
                            self.default_type(
                                value_types.get(i).copied().unwrap_or(INVALID),
                            )
                        });
                        let kind = match d.kind {
                            ast::ValueKind::Var => ObjKind::Var {
                                is_field: false,
                                embedded: false,
                            },
                            ast::ValueKind::Const => ObjKind::Const,
                        };
                        let obj = self.store.alloc_object(ObjectData {
                            name: name.name.clone(),
                            kind,
                            pkg: Some(self.pkg_path.clone()),
                            file: Some(fid),
                            range: Some(name.range),
                            ty: t,
                            doc: spec.doc.clone(),
                        });
                        self.info.record_def(
                            fid,
                            IdentEntry {
                                name: name.name.clone(),
                                range: name.range,
                                obj,
                            },
                        );
                        if let Some(scope) = scopes.last_mut() {
                            scope.insert(name.name.clone(), obj);
                        }
                    }
                }
            }
            ast::Stmt::Return { exprs, .. } => {
                for e in exprs {
                    self.check_expr(fid, e, scopes);
                }
            }
            ast::Stmt::If {
                cond, then, els, ..
            } => {
                self.check_expr(fid, cond, scopes);
                self.check_block(fid, then, scopes, labels);
                if let Some(els) = els {
                    self.check_stmt(fid, els, scopes, labels);
                }
            }
            ast::Stmt::For { cond, body, .. } => {
                if let Some(cond) = cond {
                    self.check_expr(fid, cond, scopes);
                }
                self.check_block(fid, body, scopes, labels);
            }
            ast::Stmt::Labeled { stmt, .. } => {
                // The label itself was collected up front.
                self.check_stmt(fid, stmt, scopes, labels);
            }
            ast::Stmt::Branch { label, .. } => {
                if let Some(label) = label {
                    if let Some(obj) = labels.get(&label.name).copied() {
                        self.record_use(fid, label, obj);
                    }
                }
            }
            ast::Stmt::Block(b) => self.check_block(fid, b, scopes, labels),
        }
    }

    fn lookup_local(&self, scopes: &LocalScopes, name: &str) -> Option<ObjId> {
        scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Resolve an identifier in expression position and record the use.
    fn resolve_ident(
        &mut self,
        fid: FileId,
        ident: &ast::Ident,
        scopes: &LocalScopes,
    ) -> Option<ObjId> {
        if ident.name.is_empty() || ident.name == "_" {
            return None;
        }
        let obj = self
            .lookup_local(scopes, &ident.name)
            .or_else(|| self.pkg_scope.get(&ident.name).copied())
            .or_else(|| self.lookup_file_scope(fid, &ident.name))
            .or_else(|| self.universe.lookup(&ident.name))?;
        self.record_use(fid, ident, obj);
        Some(obj)
    }

    fn obj_value_type(&self, obj: ObjId) -> TypeId {
        let data = self.store.object(obj);
        match data.kind {
            ObjKind::PkgName { .. } | ObjKind::Builtin | ObjKind::Label => INVALID,
            _ => data.ty,
        }
    }

    /// Untyped expressions assigned to a variable take their default type.
    fn default_type(&self, t: TypeId) -> TypeId {
        if let TypeData::Basic(b) = self.store.type_data(t) {
            if b.is_untyped() && b != Basic::UntypedNil {
                return self.store.basic(b.default_kind());
            }
        }
        t
    }

    fn check_expr(
        &mut self,
        fid: FileId,
        expr: &ast::Expr,
        scopes: &mut LocalScopes,
    ) -> TypeId {
        let t = self.check_expr_inner(fid, expr, scopes);
        self.info.record_type(fid, expr.range(), t);
        t
    }

    fn check_expr_inner(
        &mut self,
        fid: FileId,
        expr: &ast::Expr,
        scopes: &mut LocalScopes,
    ) -> TypeId {
        match expr {
            ast::Expr::Ident(ident) => match self.resolve_ident(fid, ident, scopes) {
                Some(obj) => self.obj_value_type(obj),
                None => INVALID,
            },
            ast::Expr::Lit(lit) => self.store.basic(match lit.kind {
                ast::LitKind::Int => Basic::UntypedInt,
                ast::LitKind::Float => Basic::UntypedFloat,
                ast::LitKind::String => Basic::UntypedString,
                ast::LitKind::Char => Basic::UntypedRune,
            }),
            ast::Expr::Selector { x, sel, .. } => {
                self.check_selector(fid, x, sel, scopes)
            }
            ast::Expr::Call { fun, args, .. } => {
                self.check_call(fid, fun, args, scopes)
            }
            ast::Expr::Unary { op, x, .. } => {
                let t = self.check_expr(fid, x, scopes);
                match op {
                    ast::UnOp::Addr => self.store.alloc_type(TypeData::Pointer { elem: t }),
                    ast::UnOp::Deref => {
                        if self.store.is_pointer(t) {
                            self.store.deref(t)
                        } else {
                            INVALID
                        }
                    }
                    ast::UnOp::Not => self.store.basic(Basic::Bool),
                    ast::UnOp::Neg => t,
                }
            }
            ast::Expr::Binary { op, x, y, .. } => {
                let tx = self.check_expr(fid, x, scopes);
                let ty = self.check_expr(fid, y, scopes);
                match op.as_str() {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => {
                        self.store.basic(Basic::UntypedBool)
                    }
                    _ => {
                        if tx != INVALID {
                            tx
                        } else {
                            ty
                        }
                    }
                }
            }
            ast::Expr::Composite { ty, elems, .. } => {
                let t = self.resolve_type_expr(fid, ty, None);
                let under = self.store.underlying(t);
                for elem in elems {
                    match elem {
                        ast::Expr::KeyValue { key, value, .. } => {
                            let mut resolved_key = false;
                            if let ast::Expr::Ident(key_ident) = key.as_ref() {
                                if matches!(
                                    self.store.type_data(under),
                                    TypeData::Struct { .. }
                                ) {
                                    if let Some(field) =
                                        self.store.lookup_field(t, &key_ident.name)
                                    {
                                        self.record_use(fid, key_ident, field);
                                        resolved_key = true;
                                    }
                                }
                            }
                            if !resolved_key {
                                self.check_expr(fid, key, scopes);
                            }
                            self.check_expr(fid, value, scopes);
                        }
                        other => {
                            self.check_expr(fid, other, scopes);
                        }
                    }
                }
                t
            }
            ast::Expr::KeyValue { key, value, .. } => {
                self.check_expr(fid, key, scopes);
                self.check_expr(fid, value, scopes)
            }
            ast::Expr::Paren { x, .. } => self.check_expr(fid, x, scopes),
            ast::Expr::Index { x, index, .. } => {
                let t = self.check_expr(fid, x, scopes);
                self.check_expr(fid, index, scopes);
                match self.store.type_data(self.store.underlying(self.store.deref(t))) {
                    TypeData::Slice { elem } => elem,
                    TypeData::Map { value, .. } => value,
                    TypeData::Basic(Basic::String) => self.store.basic(Basic::Byte),
                    _ => INVALID,
                }
            }
        }
    }

    fn check_selector(
        &mut self,
        fid: FileId,
        x: &ast::Expr,
        sel: &ast::Ident,
        scopes: &mut LocalScopes,
    ) -> TypeId {
        // Package-qualified reference: pkg.Name
        if let ast::Expr::Ident(qualifier) = x {
            if let Some(obj) = self.resolve_ident(fid, qualifier, scopes) {
                if let ObjKind::PkgName { imported } = self.store.object(obj).kind {
                    let Some(scope) = self.imports.get(&imported) else {
                        return INVALID;
                    };
                    let Some(member) = scope.lookup(&sel.name) else {
                        return INVALID;
                    };
                    self.record_use(fid, sel, member);
                    return self.obj_value_type(member);
                }
                // Plain value: fall through with its type.
                self.info
                    .record_type(fid, x.range(), self.obj_value_type(obj));
                return self.select_member(fid, self.obj_value_type(obj), sel);
            }
            return INVALID;
        }

        let tx = self.check_expr(fid, x, scopes);
        self.select_member(fid, tx, sel)
    }

    /// Field or method selection on a value of type `t`.
    fn select_member(&mut self, fid: FileId, t: TypeId, sel: &ast::Ident) -> TypeId {
        if t == INVALID {
            return INVALID;
        }
        if let Some(field) = self.store.lookup_field(t, &sel.name) {
            self.record_use(fid, sel, field);
            return self.store.object(field).ty;
        }
        if let Some(method) = self.store.lookup_method(t, &sel.name) {
            self.record_use(fid, sel, method);
            return self.store.object(method).ty;
        }
        INVALID
    }

    fn check_call(
        &mut self,
        fid: FileId,
        fun: &ast::Expr,
        args: &[ast::Expr],
        scopes: &mut LocalScopes,
    ) -> TypeId {
        // Builtins and conversions need the callee object, not just its type.
        if let ast::Expr::Ident(ident) = fun {
            if let Some(obj) = self.resolve_ident(fid, ident, scopes) {
                let data = self.store.object(obj);
                self.info
                    .record_type(fid, ident.range, self.obj_value_type(obj));
                let arg_types: Vec<TypeId> = args
                    .iter()
                    .map(|a| self.check_expr(fid, a, scopes))
                    .collect();
                return match &data.kind {
                    ObjKind::Builtin => {
                        self.builtin_call_type(&data.name, args, &arg_types)
                    }
                    ObjKind::TypeName { .. } => data.ty, // conversion
                    _ => self.call_result(data.ty),
                };
            }
            for a in args {
                self.check_expr(fid, a, scopes);
            }
            return INVALID;
        }

        let t = self.check_expr(fid, fun, scopes);
        for a in args {
            self.check_expr(fid, a, scopes);
        }
        self.call_result(t)
    }

    fn call_result(&self, sig: TypeId) -> TypeId {
        match self.store.type_data(sig) {
            TypeData::Signature { results, .. } if results.len() == 1 => results[0],
            _ => INVALID,
        }
    }

    fn builtin_call_type(
        &self,
        name: &str,
        args: &[ast::Expr],
        arg_types: &[TypeId],
    ) -> TypeId {
        let _ = args;
        match name {
            "len" | "cap" => self.store.basic(Basic::Int),
            "new" => {
                let elem = arg_types.first().copied().unwrap_or(INVALID);
                self.store.alloc_type(TypeData::Pointer { elem })
            }
            "make" | "append" => arg_types.first().copied().unwrap_or(INVALID),
            _ => INVALID,
        }
    }
}

/// The name ident of an embedded field's type: `T`, `pkg.T`, or `*T`.
fn embedded_name(ty: &ast::TypeExpr) -> Option<&ast::Ident> {
    match ty {
        ast::TypeExpr::Path(p) => Some(&p.name),
        ast::TypeExpr::Pointer { elem, .. } => embedded_name(elem),
        _ => None,
    }
}

/// The type path of an embedded field, with pointer-ness split off.
fn embedded_path(ty: &ast::TypeExpr) -> Option<(&ast::TypePath, bool)> {
    match ty {
        ast::TypeExpr::Path(p) => Some((p, false)),
        ast::TypeExpr::Pointer { elem, .. } => match elem.as_ref() {
            ast::TypeExpr::Path(p) => Some((p, true)),
            _ => None,
        },
        _ => None,
    }
}
