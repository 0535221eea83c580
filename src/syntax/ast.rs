//! Abstract syntax tree for the source language.
//!
//! Nodes are plain boxed trees with `TextRange` spans; the files a
//! language server walks are small, so the arena tricks a batch compiler
//! would use buy nothing here. The node set is the closed sum the
//! position resolver reduces over: identifiers, selector and call
//! expressions, type specs, function declarations, and basic literals.

use smol_str::SmolStr;

use crate::base::{FileId, TextRange};

/// An identifier with its source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: SmolStr,
    pub range: TextRange,
}

impl Ident {
    pub fn new(name: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// A literal token: number, string, or character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Literal text as written, including quotes for strings.
    pub text: SmolStr,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    String,
    Char,
}

impl BasicLit {
    /// The unquoted value of a string literal.
    pub fn string_value(&self) -> SmolStr {
        let t = self.text.as_str();
        let trimmed = t
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| t.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
            .unwrap_or(t);
        SmolStr::new(trimmed)
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct File {
    pub file_id: FileId,
    /// Doc comment above the package clause.
    pub doc: Option<String>,
    /// Name in the package clause.
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub alias: Option<Ident>,
    pub path: BasicLit,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Type(TypeDecl),
    Value(ValueDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn range(&self) -> TextRange {
        match self {
            Decl::Type(d) => d.range,
            Decl::Value(d) => d.range,
            Decl::Func(d) => d.range,
        }
    }
}

/// A `type` declaration (single spec or parenthesized block).
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub specs: Vec<TypeSpec>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub doc: Option<String>,
    pub name: Ident,
    /// `type A = B` alias form.
    pub alias: bool,
    pub ty: TypeExpr,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Var,
    Const,
}

/// A `var` or `const` declaration (single spec or block).
#[derive(Debug, Clone)]
pub struct ValueDecl {
    pub kind: ValueKind,
    pub specs: Vec<ValueSpec>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub doc: Option<String>,
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub doc: Option<String>,
    /// Receiver field; `None` for free functions.
    pub recv: Option<Field>,
    pub name: Ident,
    pub params: Vec<Field>,
    pub results: Vec<TypeExpr>,
    pub body: Option<Block>,
    pub range: TextRange,
}

/// A field: struct field, parameter, result, or receiver.
///
/// `names` is empty for embedded struct fields and unnamed parameters.
#[derive(Debug, Clone)]
pub struct Field {
    pub doc: Option<String>,
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
    pub tag: Option<BasicLit>,
    pub range: TextRange,
}

impl Field {
    /// Whether this is an embedded (anonymous) field.
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// A possibly qualified type name: `T` or `pkg.T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePath {
    pub qualifier: Option<Ident>,
    pub name: Ident,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Path(TypePath),
    Pointer {
        elem: Box<TypeExpr>,
        range: TextRange,
    },
    Slice {
        elem: Box<TypeExpr>,
        range: TextRange,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        range: TextRange,
    },
    Struct {
        fields: Vec<Field>,
        range: TextRange,
    },
    Interface {
        elems: Vec<InterfaceElem>,
        range: TextRange,
    },
    Func {
        params: Vec<Field>,
        results: Vec<TypeExpr>,
        range: TextRange,
    },
}

impl TypeExpr {
    pub fn range(&self) -> TextRange {
        match self {
            TypeExpr::Path(p) => p.range,
            TypeExpr::Pointer { range, .. }
            | TypeExpr::Slice { range, .. }
            | TypeExpr::Map { range, .. }
            | TypeExpr::Struct { range, .. }
            | TypeExpr::Interface { range, .. }
            | TypeExpr::Func { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InterfaceElem {
    Method {
        doc: Option<String>,
        name: Ident,
        params: Vec<Field>,
        results: Vec<TypeExpr>,
        range: TextRange,
    },
    Embedded(TypePath),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    /// `lhs = rhs` or `lhs := rhs` (`define`).
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
        define: bool,
        range: TextRange,
    },
    Decl(ValueDecl),
    Return {
        exprs: Vec<Expr>,
        range: TextRange,
    },
    If {
        cond: Expr,
        then: Block,
        els: Option<Box<Stmt>>,
        range: TextRange,
    },
    For {
        cond: Option<Expr>,
        body: Block,
        range: TextRange,
    },
    Labeled {
        label: Ident,
        stmt: Box<Stmt>,
        range: TextRange,
    },
    Branch {
        /// `break`, `continue`, or `goto`
        keyword: SmolStr,
        label: Option<Ident>,
        range: TextRange,
    },
    Block(Block),
}

impl Stmt {
    pub fn range(&self) -> TextRange {
        match self {
            Stmt::Expr(e) => e.range(),
            Stmt::Assign { range, .. }
            | Stmt::Return { range, .. }
            | Stmt::If { range, .. }
            | Stmt::For { range, .. }
            | Stmt::Labeled { range, .. }
            | Stmt::Branch { range, .. } => *range,
            Stmt::Decl(d) => d.range,
            Stmt::Block(b) => b.range,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Ident),
    Lit(BasicLit),
    Selector {
        x: Box<Expr>,
        sel: Ident,
        range: TextRange,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        range: TextRange,
    },
    Unary {
        op: UnOp,
        x: Box<Expr>,
        range: TextRange,
    },
    Binary {
        op: SmolStr,
        x: Box<Expr>,
        y: Box<Expr>,
        range: TextRange,
    },
    /// Composite literal `T{...}`.
    Composite {
        ty: TypeExpr,
        elems: Vec<Expr>,
        range: TextRange,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
        range: TextRange,
    },
    Paren {
        x: Box<Expr>,
        range: TextRange,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
        range: TextRange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Addr,
    Deref,
    Not,
    Neg,
}

impl Expr {
    pub fn range(&self) -> TextRange {
        match self {
            Expr::Ident(id) => id.range,
            Expr::Lit(lit) => lit.range,
            Expr::Selector { range, .. }
            | Expr::Call { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Composite { range, .. }
            | Expr::KeyValue { range, .. }
            | Expr::Paren { range, .. }
            | Expr::Index { range, .. } => *range,
        }
    }
}
