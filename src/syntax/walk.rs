//! Finding the syntactic path enclosing a source position.
//!
//! The resolver reduces over a closed set of node kinds; everything else
//! in the tree is transparent. [`enclosing_path`] returns the interesting
//! nodes containing a position, innermost first.

use crate::base::{TextRange, TextSize};

use super::ast::*;

/// A node on the enclosing path. The variants are exactly the cases the
/// identifier resolver dispatches over.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Ident(&'a Ident),
    BasicLit(&'a BasicLit),
    /// Always an [`Expr::Call`].
    Call(&'a Expr),
    /// Always an [`Expr::Selector`].
    Selector(&'a Expr),
    TypeSpec(&'a TypeSpec),
    FuncDecl(&'a FuncDecl),
    ImportSpec(&'a ImportSpec),
    File(&'a File),
}

impl<'a> Node<'a> {
    pub fn range(&self) -> TextRange {
        match self {
            Node::Ident(n) => n.range,
            Node::BasicLit(n) => n.range,
            Node::Call(n) | Node::Selector(n) => n.range(),
            Node::TypeSpec(n) => n.range,
            Node::FuncDecl(n) => n.range,
            Node::ImportSpec(n) => n.range,
            Node::File(_) => TextRange::new(TextSize::from(0), TextSize::from(u32::MAX)),
        }
    }
}

fn contains(range: TextRange, offset: TextSize) -> bool {
    !range.is_empty() && range.start() <= offset && offset < range.end()
}

/// Compute the path of interesting nodes enclosing `offset`, innermost
/// first. The file itself is always the last element.
pub fn enclosing_path(file: &File, offset: TextSize) -> Vec<Node<'_>> {
    let mut path = Vec::new();
    path.push(Node::File(file));

    if contains(file.package.range, offset) {
        path.push(Node::Ident(&file.package));
    }

    for import in &file.imports {
        if contains(import.range, offset) {
            path.push(Node::ImportSpec(import));
            if let Some(alias) = &import.alias {
                if contains(alias.range, offset) {
                    path.push(Node::Ident(alias));
                }
            }
            if contains(import.path.range, offset) {
                path.push(Node::BasicLit(&import.path));
            }
        }
    }

    for decl in &file.decls {
        if !contains(decl.range(), offset) {
            continue;
        }
        match decl {
            Decl::Type(d) => {
                for spec in &d.specs {
                    if contains(spec.range, offset) {
                        path.push(Node::TypeSpec(spec));
                        if contains(spec.name.range, offset) {
                            path.push(Node::Ident(&spec.name));
                        }
                        walk_type(&spec.ty, offset, &mut path);
                    }
                }
            }
            Decl::Value(d) => walk_value_decl(d, offset, &mut path),
            Decl::Func(d) => {
                path.push(Node::FuncDecl(d));
                if contains(d.name.range, offset) {
                    path.push(Node::Ident(&d.name));
                }
                if let Some(recv) = &d.recv {
                    walk_field(recv, offset, &mut path);
                }
                for param in &d.params {
                    walk_field(param, offset, &mut path);
                }
                for result in &d.results {
                    walk_type(result, offset, &mut path);
                }
                if let Some(body) = &d.body {
                    walk_block(body, offset, &mut path);
                }
            }
        }
    }

    path.reverse();
    path
}

fn walk_value_decl<'a>(d: &'a ValueDecl, offset: TextSize, path: &mut Vec<Node<'a>>) {
    for spec in &d.specs {
        if !contains(spec.range, offset) {
            continue;
        }
        for name in &spec.names {
            if contains(name.range, offset) {
                path.push(Node::Ident(name));
            }
        }
        if let Some(ty) = &spec.ty {
            walk_type(ty, offset, path);
        }
        for value in &spec.values {
            walk_expr(value, offset, path);
        }
    }
}

fn walk_field<'a>(field: &'a Field, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if !contains(field.range, offset) {
        return;
    }
    for name in &field.names {
        if contains(name.range, offset) {
            path.push(Node::Ident(name));
        }
    }
    walk_type(&field.ty, offset, path);
}

fn walk_type<'a>(ty: &'a TypeExpr, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if !contains(ty.range(), offset) {
        return;
    }
    match ty {
        TypeExpr::Path(p) => walk_type_path(p, offset, path),
        TypeExpr::Pointer { elem, .. } | TypeExpr::Slice { elem, .. } => {
            walk_type(elem, offset, path)
        }
        TypeExpr::Map { key, value, .. } => {
            walk_type(key, offset, path);
            walk_type(value, offset, path);
        }
        TypeExpr::Struct { fields, .. } => {
            for field in fields {
                walk_field(field, offset, path);
            }
        }
        TypeExpr::Interface { elems, .. } => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method {
                        name,
                        params,
                        results,
                        ..
                    } => {
                        if contains(name.range, offset) {
                            path.push(Node::Ident(name));
                        }
                        for param in params {
                            walk_field(param, offset, path);
                        }
                        for result in results {
                            walk_type(result, offset, path);
                        }
                    }
                    InterfaceElem::Embedded(p) => walk_type_path(p, offset, path),
                }
            }
        }
        TypeExpr::Func {
            params, results, ..
        } => {
            for param in params {
                walk_field(param, offset, path);
            }
            for result in results {
                walk_type(result, offset, path);
            }
        }
    }
}

fn walk_type_path<'a>(p: &'a TypePath, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if let Some(q) = &p.qualifier {
        if contains(q.range, offset) {
            path.push(Node::Ident(q));
            return;
        }
    }
    if contains(p.name.range, offset) {
        path.push(Node::Ident(&p.name));
    }
}

fn walk_block<'a>(block: &'a Block, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if !contains(block.range, offset) {
        return;
    }
    for stmt in &block.stmts {
        walk_stmt(stmt, offset, path);
    }
}

fn walk_stmt<'a>(stmt: &'a Stmt, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if !contains(stmt.range(), offset) {
        return;
    }
    match stmt {
        Stmt::Expr(e) => walk_expr(e, offset, path),
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs.iter().chain(rhs) {
                walk_expr(e, offset, path);
            }
        }
        Stmt::Decl(d) => walk_value_decl(d, offset, path),
        Stmt::Return { exprs, .. } => {
            for e in exprs {
                walk_expr(e, offset, path);
            }
        }
        Stmt::If {
            cond, then, els, ..
        } => {
            walk_expr(cond, offset, path);
            walk_block(then, offset, path);
            if let Some(els) = els {
                walk_stmt(els, offset, path);
            }
        }
        Stmt::For { cond, body, .. } => {
            if let Some(cond) = cond {
                walk_expr(cond, offset, path);
            }
            walk_block(body, offset, path);
        }
        Stmt::Labeled { label, stmt, .. } => {
            if contains(label.range, offset) {
                path.push(Node::Ident(label));
            }
            walk_stmt(stmt, offset, path);
        }
        Stmt::Branch { label, .. } => {
            if let Some(label) = label {
                if contains(label.range, offset) {
                    path.push(Node::Ident(label));
                }
            }
        }
        Stmt::Block(b) => walk_block(b, offset, path),
    }
}

fn walk_expr<'a>(expr: &'a Expr, offset: TextSize, path: &mut Vec<Node<'a>>) {
    if !contains(expr.range(), offset) {
        return;
    }
    match expr {
        Expr::Ident(id) => path.push(Node::Ident(id)),
        Expr::Lit(lit) => path.push(Node::BasicLit(lit)),
        Expr::Selector { x, sel, .. } => {
            path.push(Node::Selector(expr));
            walk_expr(x, offset, path);
            if contains(sel.range, offset) {
                path.push(Node::Ident(sel));
            }
        }
        Expr::Call { fun, args, .. } => {
            path.push(Node::Call(expr));
            walk_expr(fun, offset, path);
            for arg in args {
                walk_expr(arg, offset, path);
            }
        }
        Expr::Unary { x, .. } | Expr::Paren { x, .. } => walk_expr(x, offset, path),
        Expr::Binary { x, y, .. } => {
            walk_expr(x, offset, path);
            walk_expr(y, offset, path);
        }
        Expr::Composite { ty, elems, .. } => {
            walk_type(ty, offset, path);
            for elem in elems {
                walk_expr(elem, offset, path);
            }
        }
        Expr::KeyValue { key, value, .. } => {
            walk_expr(key, offset, path);
            walk_expr(value, offset, path);
        }
        Expr::Index { x, index, .. } => {
            walk_expr(x, offset, path);
            walk_expr(index, offset, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::syntax::parser::parse_file;

    fn path_at(text: &str, offset: u32) -> Vec<String> {
        let (file, _) = parse_file(FileId::new(0), text);
        enclosing_path(&file, TextSize::from(offset))
            .into_iter()
            .map(|n| match n {
                Node::Ident(id) => format!("ident:{}", id.name),
                Node::BasicLit(_) => "lit".to_string(),
                Node::Call(_) => "call".to_string(),
                Node::Selector(_) => "selector".to_string(),
                Node::TypeSpec(s) => format!("typespec:{}", s.name.name),
                Node::FuncDecl(f) => format!("funcdecl:{}", f.name.name),
                Node::ImportSpec(_) => "import".to_string(),
                Node::File(_) => "file".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_path_on_call_argument() {
        let text = "package p; func A() {}; func B() { A() }";
        // offset of the `A` inside B's body
        let offset = text.rfind("A()").unwrap() as u32;
        let path = path_at(text, offset);
        assert_eq!(path[0], "ident:A");
        assert_eq!(path[1], "call");
        assert_eq!(path[2], "funcdecl:B");
    }

    #[test]
    fn test_path_on_selector() {
        let text = "package p; import \"fmt\"; func f() { fmt.Println(1) }";
        let offset = text.find("Println").unwrap() as u32;
        let path = path_at(text, offset);
        assert_eq!(path[0], "ident:Println");
        assert_eq!(path[1], "selector");
    }

    #[test]
    fn test_path_on_import_path() {
        let text = "package p; import \"fmt\"";
        let offset = text.find("\"fmt\"").unwrap() as u32 + 1;
        let path = path_at(text, offset);
        assert_eq!(path[0], "lit");
        assert_eq!(path[1], "import");
    }

    #[test]
    fn test_path_on_whitespace_is_sparse() {
        let text = "package p;  func A() {}";
        // the space between `p;` and `func`
        let path = path_at(text, 10);
        assert_eq!(path, vec!["file"]);
    }

    #[test]
    fn test_path_on_type_spec_name() {
        let text = "package p; type User struct { Name string }";
        let offset = text.find("User").unwrap() as u32;
        let path = path_at(text, offset);
        assert_eq!(path[0], "ident:User");
        assert_eq!(path[1], "typespec:User");
    }
}
