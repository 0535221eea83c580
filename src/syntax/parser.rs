//! Hand-written recursive-descent parser.
//!
//! The parser never fails: it accumulates [`ParseError`]s and produces the
//! best tree it can, recovering at declaration and statement boundaries.

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::{FileId, TextRange, TextSize};

use super::ast::*;
use super::token::{lex, Tok, Token};

/// A recoverable syntax error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

/// Parse one source file. Always returns a tree; syntax problems are
/// reported through the error list.
pub fn parse_file(file_id: FileId, text: &str) -> (File, Vec<ParseError>) {
    let tokens = lex(text);
    let mut p = Parser {
        text,
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let file = p.parse_file(file_id);
    (file, p.errors)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> Tok {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> Tok {
        let mut i = self.pos;
        let mut seen = 0;
        while i < self.tokens.len() {
            let k = self.tokens[i].kind;
            if !matches!(k, Tok::LineComment | Tok::BlockComment) {
                if seen == n {
                    return k;
                }
                seen += 1;
            }
            i += 1;
        }
        Tok::Error
    }

    fn at_eof(&self) -> bool {
        let mut i = self.pos;
        while i < self.tokens.len() {
            if !matches!(
                self.tokens[i].kind,
                Tok::LineComment | Tok::BlockComment
            ) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn at(&self, kind: Tok) -> bool {
        self.peek() == kind
    }

    /// Advance past comments to the next real token and return it.
    fn bump(&mut self) -> Token {
        self.skip_comments();
        if self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos];
            self.pos += 1;
            tok
        } else {
            Token {
                kind: Tok::Error,
                range: self.eof_range(),
            }
        }
    }

    fn skip_comments(&mut self) {
        while self.pos < self.tokens.len()
            && matches!(
                self.tokens[self.pos].kind,
                Tok::LineComment | Tok::BlockComment
            )
        {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: Tok) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Tok, what: &str) -> TextRange {
        if self.at(kind) {
            self.bump().range
        } else {
            let range = self.cur_range();
            self.error(format!("expected {what}"), range);
            range
        }
    }

    fn cur_range(&self) -> TextRange {
        let mut i = self.pos;
        while i < self.tokens.len() {
            if !matches!(
                self.tokens[i].kind,
                Tok::LineComment | Tok::BlockComment
            ) {
                return self.tokens[i].range;
            }
            i += 1;
        }
        self.eof_range()
    }

    fn eof_range(&self) -> TextRange {
        let end = TextSize::of(self.text);
        TextRange::new(end, end)
    }

    fn error(&mut self, message: String, range: TextRange) {
        self.errors.push(ParseError { message, range });
    }

    fn token_text(&self, range: TextRange) -> &'a str {
        &self.text[usize::from(range.start())..usize::from(range.end())]
    }

    /// Collect the comment run immediately preceding the current token as
    /// a doc comment.
    fn take_doc(&self) -> Option<String> {
        let mut i = self.pos;
        let mut lines: Vec<&str> = Vec::new();
        while i < self.tokens.len() {
            match self.tokens[i].kind {
                Tok::LineComment => {
                    let t = self.token_text(self.tokens[i].range);
                    lines.push(t.trim_start_matches("//").trim());
                }
                Tok::BlockComment => {
                    let t = self.token_text(self.tokens[i].range);
                    let t = t
                        .trim_start_matches("/*")
                        .trim_end_matches("*/")
                        .trim();
                    lines.push(t);
                }
                _ => break,
            }
            i += 1;
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    // ------------------------------------------------------------------
    // File structure
    // ------------------------------------------------------------------

    fn parse_file(&mut self, file_id: FileId) -> File {
        let doc = self.take_doc();
        self.expect(Tok::Package, "`package`");
        let package = self.parse_ident();
        self.eat(Tok::Semi);

        let mut imports = Vec::new();
        while self.at(Tok::Import) {
            self.parse_import_decl(&mut imports);
        }

        let mut decls = Vec::new();
        while !self.at_eof() {
            let before = self.pos;
            match self.peek() {
                Tok::Type => decls.push(Decl::Type(self.parse_type_decl())),
                Tok::Var | Tok::Const => {
                    decls.push(Decl::Value(self.parse_value_decl()))
                }
                Tok::Func => decls.push(Decl::Func(self.parse_func_decl())),
                Tok::Semi => {
                    self.bump();
                }
                Tok::Import => {
                    // late import block, still accept it
                    self.parse_import_decl(&mut imports);
                }
                _ => {
                    let range = self.cur_range();
                    self.error("expected declaration".to_string(), range);
                    self.bump();
                }
            }
            if self.pos == before {
                self.bump();
            }
        }

        File {
            file_id,
            doc,
            package,
            imports,
            decls,
        }
    }

    fn parse_ident(&mut self) -> Ident {
        if self.at(Tok::Ident) {
            let tok = self.bump();
            Ident::new(self.token_text(tok.range), tok.range)
        } else {
            let range = self.cur_range();
            self.error("expected identifier".to_string(), range);
            Ident::new("", TextRange::new(range.start(), range.start()))
        }
    }

    fn parse_import_decl(&mut self, imports: &mut Vec<ImportSpec>) {
        self.bump(); // `import`
        if self.eat(Tok::LParen) {
            while !self.at(Tok::RParen) && !self.at_eof() {
                let before = self.pos;
                if let Some(spec) = self.parse_import_spec() {
                    imports.push(spec);
                }
                self.eat(Tok::Semi);
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(Tok::RParen, "`)`");
        } else if let Some(spec) = self.parse_import_spec() {
            imports.push(spec);
        }
        self.eat(Tok::Semi);
    }

    fn parse_import_spec(&mut self) -> Option<ImportSpec> {
        let start = self.cur_range().start();
        let alias = if self.at(Tok::Ident) {
            Some(self.parse_ident())
        } else {
            None
        };
        if !matches!(self.peek(), Tok::Str | Tok::RawStr) {
            let range = self.cur_range();
            self.error("expected import path".to_string(), range);
            return None;
        }
        let path = self.parse_lit();
        Some(ImportSpec {
            alias,
            range: TextRange::new(start, path.range.end()),
            path,
        })
    }

    fn parse_lit(&mut self) -> BasicLit {
        let tok = self.bump();
        let kind = match tok.kind {
            Tok::Int => LitKind::Int,
            Tok::Float => LitKind::Float,
            Tok::Str | Tok::RawStr => LitKind::String,
            Tok::CharLit => LitKind::Char,
            _ => LitKind::String,
        };
        BasicLit {
            kind,
            text: SmolStr::new(self.token_text(tok.range)),
            range: tok.range,
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_type_decl(&mut self) -> TypeDecl {
        // The doc of a single-spec declaration sits before the keyword.
        let decl_doc = self.take_doc();
        let start = self.cur_range().start();
        self.bump(); // `type`
        let mut specs = Vec::new();
        if self.eat(Tok::LParen) {
            while !self.at(Tok::RParen) && !self.at_eof() {
                let before = self.pos;
                specs.push(self.parse_type_spec());
                self.eat(Tok::Semi);
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(Tok::RParen, "`)`");
        } else {
            let mut spec = self.parse_type_spec();
            if spec.doc.is_none() {
                spec.doc = decl_doc;
            }
            specs.push(spec);
        }
        let end = specs
            .last()
            .map(|s| s.range.end())
            .unwrap_or(start);
        self.eat(Tok::Semi);
        TypeDecl {
            specs,
            range: TextRange::new(start, end),
        }
    }

    fn parse_type_spec(&mut self) -> TypeSpec {
        let doc = self.take_doc();
        let name = self.parse_ident();
        let alias = self.eat(Tok::Eq);
        let ty = self.parse_type_expr();
        let range = TextRange::new(name.range.start(), ty.range().end());
        TypeSpec {
            doc,
            name,
            alias,
            ty,
            range,
        }
    }

    fn parse_value_decl(&mut self) -> ValueDecl {
        let decl_doc = self.take_doc();
        let start = self.cur_range().start();
        let kind = if self.bump().kind == Tok::Const {
            ValueKind::Const
        } else {
            ValueKind::Var
        };
        let mut specs = Vec::new();
        if self.eat(Tok::LParen) {
            while !self.at(Tok::RParen) && !self.at_eof() {
                let before = self.pos;
                specs.push(self.parse_value_spec());
                self.eat(Tok::Semi);
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(Tok::RParen, "`)`");
        } else {
            let mut spec = self.parse_value_spec();
            if spec.doc.is_none() {
                spec.doc = decl_doc;
            }
            specs.push(spec);
        }
        let end = specs.last().map(|s| s.range.end()).unwrap_or(start);
        self.eat(Tok::Semi);
        ValueDecl {
            kind,
            specs,
            range: TextRange::new(start, end),
        }
    }

    fn parse_value_spec(&mut self) -> ValueSpec {
        let doc = self.take_doc();
        let mut names = vec![self.parse_ident()];
        while self.eat(Tok::Comma) {
            names.push(self.parse_ident());
        }
        let ty = if !matches!(
            self.peek(),
            Tok::Eq | Tok::Semi | Tok::RParen | Tok::Error
        ) {
            Some(self.parse_type_expr())
        } else {
            None
        };
        let mut values = Vec::new();
        if self.eat(Tok::Eq) {
            values.push(self.parse_expr(true));
            while self.eat(Tok::Comma) {
                values.push(self.parse_expr(true));
            }
        }
        let start = names[0].range.start();
        let end = values
            .last()
            .map(|e| e.range().end())
            .or_else(|| ty.as_ref().map(|t| t.range().end()))
            .unwrap_or_else(|| names.last().map(|n| n.range.end()).unwrap_or(start));
        ValueSpec {
            doc,
            names,
            ty,
            values,
            range: TextRange::new(start, end),
        }
    }

    fn parse_func_decl(&mut self) -> FuncDecl {
        let doc = self.take_doc();
        let start = self.cur_range().start();
        self.bump(); // `func`

        let recv = if self.at(Tok::LParen) {
            self.bump();
            let field = self.parse_recv_field();
            self.expect(Tok::RParen, "`)`");
            Some(field)
        } else {
            None
        };

        let name = self.parse_ident();
        let params = self.parse_params();
        let results = self.parse_results();
        let body = if self.at(Tok::LBrace) {
            Some(self.parse_block())
        } else {
            None
        };
        let end = body
            .as_ref()
            .map(|b| b.range.end())
            .unwrap_or_else(|| self.cur_range().start());
        self.eat(Tok::Semi);

        FuncDecl {
            doc,
            recv,
            name,
            params,
            results,
            body,
            range: TextRange::new(start, end),
        }
    }

    /// Receiver: `(r *T)`, `(r T)`, or `(*T)` / `(T)`.
    fn parse_recv_field(&mut self) -> Field {
        let start = self.cur_range().start();
        if self.at(Tok::Ident) && !matches!(self.nth(1), Tok::RParen | Tok::Dot) {
            let name = self.parse_ident();
            let ty = self.parse_type_expr();
            let range = TextRange::new(start, ty.range().end());
            Field {
                doc: None,
                names: vec![name],
                ty,
                tag: None,
                range,
            }
        } else {
            let ty = self.parse_type_expr();
            let range = TextRange::new(start, ty.range().end());
            Field {
                doc: None,
                names: Vec::new(),
                ty,
                tag: None,
                range,
            }
        }
    }

    fn parse_params(&mut self) -> Vec<Field> {
        let mut fields = Vec::new();
        self.expect(Tok::LParen, "`(`");
        while !self.at(Tok::RParen) && !self.at_eof() {
            let before = self.pos;
            self.parse_param_group(&mut fields);
            self.eat(Tok::Comma);
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(Tok::RParen, "`)`");
        fields
    }

    /// One parameter group: `a, b T`, `a T`, or a bare type.
    fn parse_param_group(&mut self, fields: &mut Vec<Field>) {
        let start = self.cur_range().start();
        if self.at(Tok::Ident) {
            let save = self.pos;
            let mut names = vec![self.parse_ident()];
            while self.at(Tok::Comma) && self.nth(1) == Tok::Ident {
                self.bump();
                names.push(self.parse_ident());
            }
            if self.starts_type() && !self.at(Tok::Dot) {
                let ty = self.parse_type_expr();
                let range = TextRange::new(start, ty.range().end());
                fields.push(Field {
                    doc: None,
                    names,
                    ty,
                    tag: None,
                    range,
                });
                return;
            }
            // Not names after all: rewind and parse types.
            self.pos = save;
        }
        let ty = self.parse_type_expr();
        let range = TextRange::new(start, ty.range().end());
        fields.push(Field {
            doc: None,
            names: Vec::new(),
            ty,
            tag: None,
            range,
        });
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek(),
            Tok::Ident
                | Tok::Star
                | Tok::LBracket
                | Tok::Map
                | Tok::Func
                | Tok::Struct
                | Tok::Interface
                | Tok::LParen
        )
    }

    fn parse_results(&mut self) -> Vec<TypeExpr> {
        if self.at(Tok::LParen) {
            self.bump();
            let mut results = Vec::new();
            while !self.at(Tok::RParen) && !self.at_eof() {
                let before = self.pos;
                // Named results: skip the name, keep the type.
                if self.at(Tok::Ident)
                    && self.nth(1) != Tok::Comma
                    && self.nth(1) != Tok::RParen
                    && self.nth(1) != Tok::Dot
                {
                    self.bump();
                }
                results.push(self.parse_type_expr());
                self.eat(Tok::Comma);
                if self.pos == before {
                    self.bump();
                }
            }
            self.expect(Tok::RParen, "`)`");
            results
        } else if self.starts_type() && !self.at(Tok::LBrace) {
            vec![self.parse_type_expr()]
        } else {
            Vec::new()
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type_expr(&mut self) -> TypeExpr {
        let start = self.cur_range().start();
        match self.peek() {
            Tok::Star => {
                self.bump();
                let elem = self.parse_type_expr();
                let range = TextRange::new(start, elem.range().end());
                TypeExpr::Pointer {
                    elem: Box::new(elem),
                    range,
                }
            }
            Tok::LBracket => {
                self.bump();
                // Array lengths are accepted and ignored.
                if self.at(Tok::Int) {
                    self.bump();
                }
                self.expect(Tok::RBracket, "`]`");
                let elem = self.parse_type_expr();
                let range = TextRange::new(start, elem.range().end());
                TypeExpr::Slice {
                    elem: Box::new(elem),
                    range,
                }
            }
            Tok::Map => {
                self.bump();
                self.expect(Tok::LBracket, "`[`");
                let key = self.parse_type_expr();
                self.expect(Tok::RBracket, "`]`");
                let value = self.parse_type_expr();
                let range = TextRange::new(start, value.range().end());
                TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                    range,
                }
            }
            Tok::Struct => {
                self.bump();
                self.expect(Tok::LBrace, "`{`");
                let mut fields = Vec::new();
                while !self.at(Tok::RBrace) && !self.at_eof() {
                    let before = self.pos;
                    fields.push(self.parse_struct_field());
                    self.eat(Tok::Semi);
                    if self.pos == before {
                        self.bump();
                    }
                }
                let end = self.expect(Tok::RBrace, "`}`").end();
                TypeExpr::Struct {
                    fields,
                    range: TextRange::new(start, end),
                }
            }
            Tok::Interface => {
                self.bump();
                self.expect(Tok::LBrace, "`{`");
                let mut elems = Vec::new();
                while !self.at(Tok::RBrace) && !self.at_eof() {
                    let before = self.pos;
                    elems.push(self.parse_interface_elem());
                    self.eat(Tok::Semi);
                    if self.pos == before {
                        self.bump();
                    }
                }
                let end = self.expect(Tok::RBrace, "`}`").end();
                TypeExpr::Interface {
                    elems,
                    range: TextRange::new(start, end),
                }
            }
            Tok::Func => {
                self.bump();
                let params = self.parse_params();
                let results = self.parse_results();
                let end = results
                    .last()
                    .map(|t| t.range().end())
                    .unwrap_or_else(|| self.cur_range().start());
                TypeExpr::Func {
                    params,
                    results,
                    range: TextRange::new(start, end),
                }
            }
            Tok::LParen => {
                self.bump();
                let inner = self.parse_type_expr();
                self.expect(Tok::RParen, "`)`");
                inner
            }
            Tok::Ident => TypeExpr::Path(self.parse_type_path()),
            _ => {
                let range = self.cur_range();
                self.error("expected type".to_string(), range);
                TypeExpr::Path(TypePath {
                    qualifier: None,
                    name: Ident::new("", TextRange::new(start, start)),
                    range: TextRange::new(start, start),
                })
            }
        }
    }

    fn parse_type_path(&mut self) -> TypePath {
        let first = self.parse_ident();
        if self.at(Tok::Dot) && self.nth(1) == Tok::Ident {
            self.bump();
            let name = self.parse_ident();
            let range = TextRange::new(first.range.start(), name.range.end());
            TypePath {
                qualifier: Some(first),
                name,
                range,
            }
        } else {
            let range = first.range;
            TypePath {
                qualifier: None,
                name: first,
                range,
            }
        }
    }

    fn parse_struct_field(&mut self) -> Field {
        let doc = self.take_doc();
        let start = self.cur_range().start();

        // Embedded pointer field: *T or *pkg.T
        if self.at(Tok::Star) {
            self.bump();
            let path = self.parse_type_path();
            let range = TextRange::new(start, path.range.end());
            let ty = TypeExpr::Pointer {
                elem: Box::new(TypeExpr::Path(path)),
                range,
            };
            let tag = self.parse_tag();
            return Field {
                doc,
                names: Vec::new(),
                ty,
                tag,
                range,
            };
        }

        let save = self.pos;
        let mut names = vec![self.parse_ident()];
        while self.at(Tok::Comma) && self.nth(1) == Tok::Ident {
            self.bump();
            names.push(self.parse_ident());
        }

        if self.starts_type() || self.at(Tok::Dot) && names.len() == 1 {
            if self.at(Tok::Dot) {
                // Embedded qualified field: pkg.T
                self.pos = save;
                let path = self.parse_type_path();
                let range = path.range;
                let tag = self.parse_tag();
                return Field {
                    doc,
                    names: Vec::new(),
                    ty: TypeExpr::Path(path),
                    tag,
                    range,
                };
            }
            let ty = self.parse_type_expr();
            let range = TextRange::new(start, ty.range().end());
            let tag = self.parse_tag();
            return Field {
                doc,
                names,
                ty,
                tag,
                range,
            };
        }

        // Embedded simple field: T
        let name = names.remove(0);
        let range = name.range;
        let path = TypePath {
            qualifier: None,
            name,
            range,
        };
        let tag = self.parse_tag();
        Field {
            doc,
            names: Vec::new(),
            ty: TypeExpr::Path(path),
            tag,
            range,
        }
    }

    fn parse_tag(&mut self) -> Option<BasicLit> {
        if matches!(self.peek(), Tok::Str | Tok::RawStr) {
            Some(self.parse_lit())
        } else {
            None
        }
    }

    fn parse_interface_elem(&mut self) -> InterfaceElem {
        let doc = self.take_doc();
        if self.at(Tok::Ident) && self.nth(1) == Tok::LParen {
            let name = self.parse_ident();
            let params = self.parse_params();
            let results = self.parse_results();
            let end = results
                .last()
                .map(|t| t.range().end())
                .unwrap_or_else(|| self.cur_range().start());
            let range = TextRange::new(name.range.start(), end);
            InterfaceElem::Method {
                doc,
                name,
                params,
                results,
                range,
            }
        } else {
            InterfaceElem::Embedded(self.parse_type_path())
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Block {
        let start = self.expect(Tok::LBrace, "`{`").start();
        let mut stmts = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let before = self.pos;
            if self.at(Tok::Semi) {
                self.bump();
                continue;
            }
            stmts.push(self.parse_stmt());
            self.eat(Tok::Semi);
            if self.pos == before {
                self.bump();
            }
        }
        let end = self.expect(Tok::RBrace, "`}`").end();
        Block {
            stmts,
            range: TextRange::new(start, end),
        }
    }

    fn parse_stmt(&mut self) -> Stmt {
        match self.peek() {
            Tok::Var | Tok::Const => Stmt::Decl(self.parse_value_decl()),
            Tok::Return => {
                let start = self.cur_range().start();
                self.bump();
                let mut exprs = Vec::new();
                if !matches!(self.peek(), Tok::Semi | Tok::RBrace | Tok::Error) {
                    exprs.push(self.parse_expr(true));
                    while self.eat(Tok::Comma) {
                        exprs.push(self.parse_expr(true));
                    }
                }
                let end = exprs
                    .last()
                    .map(|e| e.range().end())
                    .unwrap_or_else(|| self.cur_range().start());
                Stmt::Return {
                    exprs,
                    range: TextRange::new(start, end),
                }
            }
            Tok::If => self.parse_if(),
            Tok::For => {
                let start = self.cur_range().start();
                self.bump();
                let cond = if self.at(Tok::LBrace) {
                    None
                } else {
                    Some(self.parse_expr(false))
                };
                let body = self.parse_block();
                let range = TextRange::new(start, body.range.end());
                Stmt::For { cond, body, range }
            }
            Tok::Break | Tok::Continue | Tok::Goto => {
                let tok = self.bump();
                let keyword = SmolStr::new(self.token_text(tok.range));
                let label = if self.at(Tok::Ident) {
                    Some(self.parse_ident())
                } else {
                    None
                };
                let end = label
                    .as_ref()
                    .map(|l| l.range.end())
                    .unwrap_or(tok.range.end());
                Stmt::Branch {
                    keyword,
                    label,
                    range: TextRange::new(tok.range.start(), end),
                }
            }
            Tok::LBrace => Stmt::Block(self.parse_block()),
            Tok::Ident if self.nth(1) == Tok::Colon => {
                let label = self.parse_ident();
                self.bump(); // `:`
                let stmt = self.parse_stmt();
                let range = TextRange::new(label.range.start(), stmt.range().end());
                Stmt::Labeled {
                    label,
                    stmt: Box::new(stmt),
                    range,
                }
            }
            _ => {
                let first = self.parse_expr(true);
                if matches!(self.peek(), Tok::Eq | Tok::ColonEq | Tok::Comma) {
                    let mut lhs = vec![first];
                    while self.eat(Tok::Comma) {
                        lhs.push(self.parse_expr(true));
                    }
                    let define = match self.peek() {
                        Tok::ColonEq => {
                            self.bump();
                            true
                        }
                        Tok::Eq => {
                            self.bump();
                            false
                        }
                        _ => {
                            // e.g. stray comma; treat as expression list
                            let range = self.cur_range();
                            self.error("expected `=` or `:=`".to_string(), range);
                            false
                        }
                    };
                    let mut rhs = vec![self.parse_expr(true)];
                    while self.eat(Tok::Comma) {
                        rhs.push(self.parse_expr(true));
                    }
                    let start = lhs[0].range().start();
                    let end = rhs
                        .last()
                        .map(|e| e.range().end())
                        .unwrap_or(start);
                    Stmt::Assign {
                        lhs,
                        rhs,
                        define,
                        range: TextRange::new(start, end),
                    }
                } else {
                    Stmt::Expr(first)
                }
            }
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.cur_range().start();
        self.bump(); // `if`
        let cond = self.parse_expr(false);
        let then = self.parse_block();
        let els = if self.eat(Tok::Else) {
            if self.at(Tok::If) {
                Some(Box::new(self.parse_if()))
            } else {
                Some(Box::new(Stmt::Block(self.parse_block())))
            }
        } else {
            None
        };
        let end = els
            .as_ref()
            .map(|s| s.range().end())
            .unwrap_or(then.range.end());
        Stmt::If {
            cond,
            then,
            els,
            range: TextRange::new(start, end),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, allow_composite: bool) -> Expr {
        self.parse_binary(1, allow_composite)
    }

    fn parse_binary(&mut self, min_prec: u8, allow_composite: bool) -> Expr {
        let mut lhs = self.parse_unary(allow_composite);
        loop {
            let prec = match self.peek() {
                Tok::PipePipe => 1,
                Tok::AmpAmp => 2,
                Tok::EqEq | Tok::NotEq | Tok::Le | Tok::Ge | Tok::Lt | Tok::Gt => 3,
                Tok::Plus | Tok::Minus | Tok::Pipe => 4,
                Tok::Star | Tok::Slash | Tok::Percent | Tok::Amp => 5,
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            let op_tok = self.bump();
            let op = SmolStr::new(self.token_text(op_tok.range));
            let rhs = self.parse_binary(prec + 1, allow_composite);
            let range = TextRange::new(lhs.range().start(), rhs.range().end());
            lhs = Expr::Binary {
                op,
                x: Box::new(lhs),
                y: Box::new(rhs),
                range,
            };
        }
        lhs
    }

    fn parse_unary(&mut self, allow_composite: bool) -> Expr {
        let op = match self.peek() {
            Tok::Amp => Some(UnOp::Addr),
            Tok::Star => Some(UnOp::Deref),
            Tok::Bang => Some(UnOp::Not),
            Tok::Minus => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.bump();
            let x = self.parse_unary(allow_composite);
            let range = TextRange::new(tok.range.start(), x.range().end());
            return Expr::Unary {
                op,
                x: Box::new(x),
                range,
            };
        }
        self.parse_postfix(allow_composite)
    }

    fn parse_postfix(&mut self, allow_composite: bool) -> Expr {
        let mut expr = self.parse_operand(allow_composite);
        loop {
            match self.peek() {
                Tok::Dot if self.nth(1) == Tok::Ident => {
                    self.bump();
                    let sel = self.parse_ident();
                    let range = TextRange::new(expr.range().start(), sel.range.end());
                    expr = Expr::Selector {
                        x: Box::new(expr),
                        sel,
                        range,
                    };
                }
                Tok::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    while !self.at(Tok::RParen) && !self.at_eof() {
                        let before = self.pos;
                        args.push(self.parse_expr(true));
                        self.eat(Tok::Comma);
                        if self.pos == before {
                            self.bump();
                        }
                    }
                    let end = self.expect(Tok::RParen, "`)`").end();
                    let range = TextRange::new(expr.range().start(), end);
                    expr = Expr::Call {
                        fun: Box::new(expr),
                        args,
                        range,
                    };
                }
                Tok::LBracket => {
                    self.bump();
                    let index = self.parse_expr(true);
                    let end = self.expect(Tok::RBracket, "`]`").end();
                    let range = TextRange::new(expr.range().start(), end);
                    expr = Expr::Index {
                        x: Box::new(expr),
                        index: Box::new(index),
                        range,
                    };
                }
                Tok::LBrace if allow_composite => {
                    // Composite literal: T{...} / pkg.T{...}
                    let ty = match expr_to_type_path(&expr) {
                        Some(path) => TypeExpr::Path(path),
                        None => break,
                    };
                    expr = self.parse_composite_body(ty);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_operand(&mut self, allow_composite: bool) -> Expr {
        match self.peek() {
            Tok::Ident => Expr::Ident(self.parse_ident()),
            Tok::Int | Tok::Float | Tok::Str | Tok::RawStr | Tok::CharLit => {
                Expr::Lit(self.parse_lit())
            }
            Tok::LParen => {
                let start = self.bump().range.start();
                let x = self.parse_expr(true);
                let end = self.expect(Tok::RParen, "`)`").end();
                Expr::Paren {
                    x: Box::new(x),
                    range: TextRange::new(start, end),
                }
            }
            Tok::LBracket | Tok::Map | Tok::Struct | Tok::Interface | Tok::Func => {
                // Type literal followed by a composite body: []T{...}
                let ty = self.parse_type_expr();
                if self.at(Tok::LBrace) && allow_composite {
                    self.parse_composite_body(ty)
                } else {
                    let range = ty.range();
                    self.error("expected expression".to_string(), range);
                    Expr::Ident(Ident::new("", range))
                }
            }
            _ => {
                let range = self.cur_range();
                self.error("expected expression".to_string(), range);
                // Consume one token so the caller makes progress.
                if !self.at_eof() && !matches!(self.peek(), Tok::Semi | Tok::RBrace) {
                    self.bump();
                }
                Expr::Ident(Ident::new("", TextRange::new(range.start(), range.start())))
            }
        }
    }

    fn parse_composite_body(&mut self, ty: TypeExpr) -> Expr {
        let start = ty.range().start();
        self.expect(Tok::LBrace, "`{`");
        let mut elems = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let before = self.pos;
            let elem = self.parse_expr(true);
            let elem = if self.eat(Tok::Colon) {
                let value = self.parse_expr(true);
                let range = TextRange::new(elem.range().start(), value.range().end());
                Expr::KeyValue {
                    key: Box::new(elem),
                    value: Box::new(value),
                    range,
                }
            } else {
                elem
            };
            elems.push(elem);
            self.eat(Tok::Comma);
            self.eat(Tok::Semi);
            if self.pos == before {
                self.bump();
            }
        }
        let end = self.expect(Tok::RBrace, "`}`").end();
        Expr::Composite {
            ty,
            elems,
            range: TextRange::new(start, end),
        }
    }
}

/// Reinterpret an expression as a type path for composite literals.
fn expr_to_type_path(expr: &Expr) -> Option<TypePath> {
    match expr {
        Expr::Ident(id) => Some(TypePath {
            qualifier: None,
            name: id.clone(),
            range: id.range,
        }),
        Expr::Selector { x, sel, range } => match x.as_ref() {
            Expr::Ident(q) => Some(TypePath {
                qualifier: Some(q.clone()),
                name: sel.clone(),
                range: *range,
            }),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> File {
        let (file, errors) = parse_file(FileId::new(0), text);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        file
    }

    #[test]
    fn test_parse_package_and_imports() {
        let file = parse_ok("package p\n\nimport \"fmt\"\nimport (\n\tx \"net/http\"\n)\n");
        assert_eq!(file.package.name, "p");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].path.string_value(), "fmt");
        assert_eq!(file.imports[1].alias.as_ref().unwrap().name, "x");
    }

    #[test]
    fn test_parse_struct_type() {
        let file = parse_ok(
            "package p\n\ntype User struct {\n\tName string `json:\"name\"`\n\tAge int\n\tBase\n}\n",
        );
        let Decl::Type(decl) = &file.decls[0] else {
            panic!("expected type decl");
        };
        let TypeExpr::Struct { fields, .. } = &decl.specs[0].ty else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].names[0].name, "Name");
        assert!(fields[0].tag.is_some());
        assert!(fields[2].is_embedded());
    }

    #[test]
    fn test_parse_interface_type() {
        let file = parse_ok(
            "package p\n\ntype Reader interface {\n\tRead(p []byte) (int, error)\n}\n",
        );
        let Decl::Type(decl) = &file.decls[0] else {
            panic!("expected type decl");
        };
        let TypeExpr::Interface { elems, .. } = &decl.specs[0].ty else {
            panic!("expected interface");
        };
        assert_eq!(elems.len(), 1);
        let InterfaceElem::Method { name, params, results, .. } = &elems[0] else {
            panic!("expected method");
        };
        assert_eq!(name.name, "Read");
        assert_eq!(params.len(), 1);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_parse_method_decl() {
        let file = parse_ok("package p\n\nfunc (u *User) Name() string { return u.name }\n");
        let Decl::Func(decl) = &file.decls[0] else {
            panic!("expected func decl");
        };
        assert_eq!(decl.name.name, "Name");
        let recv = decl.recv.as_ref().unwrap();
        assert_eq!(recv.names[0].name, "u");
        assert!(matches!(recv.ty, TypeExpr::Pointer { .. }));
    }

    #[test]
    fn test_parse_calls_and_selectors() {
        let file = parse_ok("package p\n\nfunc f() { fmt.Println(len(\"x\")) }\n");
        let Decl::Func(decl) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = decl.body.as_ref().unwrap();
        let Stmt::Expr(Expr::Call { fun, args, .. }) = &body.stmts[0] else {
            panic!("expected call stmt");
        };
        assert!(matches!(fun.as_ref(), Expr::Selector { .. }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_parse_one_liner() {
        // Everything on one line, the fixture style used by the engine tests.
        let file = parse_ok("package p; func A() int { return 0 }; func B() int { return A() }");
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_parse_labeled_statement() {
        let file = parse_ok("package p\n\nfunc f() {\nloop:\n\tfor {\n\t\tbreak loop\n\t}\n}\n");
        let Decl::Func(decl) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = decl.body.as_ref().unwrap();
        assert!(matches!(body.stmts[0], Stmt::Labeled { .. }));
    }

    #[test]
    fn test_parse_recovers_from_garbage() {
        let (file, errors) = parse_file(FileId::new(0), "package p\n\nfunc f( {\n");
        assert_eq!(file.package.name, "p");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_composite_literal_not_in_if_cond() {
        let file = parse_ok("package p\n\nfunc f(x bool) { if x { f(x) } }\n");
        let Decl::Func(decl) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = decl.body.as_ref().unwrap();
        assert!(matches!(body.stmts[0], Stmt::If { .. }));
    }
}
