//! Workspace and document symbol search.
//!
//! A small query DSL (`is:exported`, `dir:<path>`, kind keywords, and
//! dotted/slashed tokens) filters and scores symbols collected from the
//! top-level declarations of every cached package.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::base::{is_exported, uri, TextRange};
use crate::project::{Package, View};
use crate::syntax::ast;

use super::{location, IdeError, Location, RequestCtx};

/// Symbol kinds, aligned with the wire protocol's numbering at the
/// dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Package,
    Class,
    Method,
    Field,
    Function,
    Variable,
    Constant,
    Interface,
}

/// Keyword tokens interpreted as kind filters, in presentation order.
const KEYWORDS: &[(&str, SymbolKind)] = &[
    ("package", SymbolKind::Package),
    ("type", SymbolKind::Class),
    ("method", SymbolKind::Method),
    ("field", SymbolKind::Field),
    ("func", SymbolKind::Function),
    ("var", SymbolKind::Variable),
    ("const", SymbolKind::Constant),
];

fn keyword_kind(token: &str) -> Option<SymbolKind> {
    KEYWORDS
        .iter()
        .find(|(k, _)| *k == token)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    None,
    Exported,
    Dir,
}

/// A structured representation parsed from the user's raw query string.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub kind: Option<SymbolKind>,
    pub filter: FilterType,
    pub file: String,
    pub dir: String,
    pub tokens: Vec<String>,
    /// Descriptor filter from `workspace/xreferences`-style callers.
    pub symbol: Option<BTreeMap<String, Value>>,
}

impl Query {
    /// Parse a user's raw query string. Queries are case-insensitive.
    pub fn parse(q: &str) -> Query {
        let q = q.to_lowercase();
        let mut query = Query::default();

        for field in q.split_whitespace() {
            if let Some(dir) = field.strip_prefix("dir:") {
                query.filter = FilterType::Dir;
                query.dir = dir.to_string();
                continue;
            }
            if field == "is:exported" {
                query.filter = FilterType::Exported;
                continue;
            }

            // Each field splits into tokens on periods and slashes.
            for tok in field.split(['.', '/']).filter(|t| !t.is_empty()) {
                if let Some(kind) = keyword_kind(tok) {
                    query.kind = Some(kind);
                    continue;
                }
                query.tokens.push(tok.to_string());
            }
        }
        query
    }
}

impl fmt::Display for Query {
    /// A logically equivalent (not byte-wise equal) query string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        match self.filter {
            FilterType::Exported => parts.push("is:exported".to_string()),
            FilterType::Dir => parts.push(format!("dir:{}", self.dir)),
            FilterType::None => {}
        }
        if let Some(kind) = self.kind {
            if let Some((kw, _)) = KEYWORDS.iter().find(|(_, k)| *k == kind) {
                parts.push((*kw).to_string());
            }
        }
        parts.extend(self.tokens.iter().cloned());
        write!(f, "{}", parts.join(" "))
    }
}

/// Symbol metadata carried alongside each result, also the payload of
/// the xdefinition descriptor. `id` is `"<pkg>/-/<recv?>/<name>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDescriptor {
    pub vendor: bool,
    pub package: String,
    pub package_name: String,
    pub recv: String,
    pub name: String,
    pub id: String,
}

impl SymbolDescriptor {
    pub fn new(package: String, package_name: String, recv: String, name: String) -> Self {
        let id = if recv.is_empty() {
            format!("{package}/-/{name}")
        } else {
            format!("{package}/-/{recv}/{name}")
        };
        Self {
            vendor: false,
            package,
            package_name,
            recv,
            name,
            id,
        }
    }

    /// Whether every key of `query` matches this descriptor.
    pub fn contains(&self, query: &BTreeMap<String, Value>) -> bool {
        query.iter().all(|(key, want)| match key.as_str() {
            "vendor" => want.as_bool() == Some(self.vendor),
            "package" => want.as_str() == Some(self.package.as_str()),
            "packageName" => want.as_str() == Some(self.package_name.as_str()),
            "recv" => want.as_str() == Some(self.recv.as_str()),
            "name" => want.as_str() == Some(self.name.as_str()),
            "id" => want.as_str() == Some(self.id.as_str()),
            _ => false,
        })
    }
}

/// One symbol search result.
#[derive(Debug, Clone)]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub container_name: String,
    pub desc: SymbolDescriptor,
}

struct ScoredSymbol {
    score: i32,
    symbol: SymbolInformation,
}

/// Score a candidate against a query. Non-matches score `0` (or `-1`
/// for a descriptor mismatch); positive scores rank.
pub fn score(q: &Query, s: &SymbolInformation) -> i32 {
    if let Some(kind) = q.kind {
        if kind != s.kind {
            return 0;
        }
    }
    if let Some(symbol) = &q.symbol {
        if !s.desc.contains(symbol) {
            return -1;
        }
    }
    let name = s.name.to_lowercase();
    let container = s.container_name.to_lowercase();
    let Some(filename) = uri::uri_to_path(&s.location.uri) else {
        return 0;
    };
    let filename = filename.to_string_lossy().replace('\\', "/");
    //if q.filter == FilterType::Exported {
    //    // is:exported excludes vendor symbols always.
    //    return 0;
    //}
    if !q.file.is_empty() && filename != q.file {
        // We're restricting results to a single file, and this isn't it.
        return 0;
    }
    if q.tokens.is_empty() {
        // early return for empty queries
        return 2;
    }

    let mut scor = 0;
    let basename = Path::new(&filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    for (i, tok) in q.tokens.iter().enumerate() {
        let tok = tok.to_lowercase();
        if container.starts_with(&tok) {
            scor += 2;
        }
        if name.starts_with(&tok) {
            scor += 3;
        }
        if filename.contains(&tok) && tok.len() >= 3 {
            scor += 1;
        }
        if basename.starts_with(&tok) && tok.len() >= 3 {
            scor += 2;
        }
        if tok == name {
            if i == q.tokens.len() - 1 {
                scor += 50;
            } else {
                scor += 5;
            }
        }
        if tok == container {
            scor += 3;
        }
    }
    if scor > 0 && !(filename.starts_with("vendor/") || filename.contains("/vendor/")) {
        // boost for non-vendor symbols
        scor += 5;
    }
    if scor > 0 && is_exported(&s.name) {
        // boost for exported symbols
        scor += 1;
    }
    scor
}

/// `workspace/symbol`.
///
/// Cancellation preserves the hits collected so far.
pub fn workspace_symbols(
    view: &View,
    ctx: &RequestCtx,
    raw_query: &str,
    symbol: Option<BTreeMap<String, Value>>,
    limit: usize,
) -> Result<Vec<SymbolInformation>, IdeError> {
    let mut query = Query::parse(raw_query);
    query.symbol = symbol;

    if query.filter == FilterType::Dir {
        if let Some(root_import) = root_import_path(view) {
            if !root_import.is_empty() {
                query.dir = format!("{}/{}", root_import, query.dir);
            }
        }
    }
    if let Some(symbol) = &query.symbol {
        if let Some(Value::String(id)) = symbol.get("id") {
            // The id implicitly carries a dir hint, narrowing the walk.
            query.dir = id.splitn(2, "/-/").next().unwrap_or("").to_string();
            query.filter = FilterType::Dir;
        }
    }
    let limit = if limit == 0 { 50 } else { limit };

    let mut results: Vec<ScoredSymbol> = Vec::new();
    let walk = view.search(|pkg| {
        // Breaking the loop on cancellation returns partial results and
        // avoids starting new computations.
        ctx.check()?;

        if !query.file.is_empty()
            && !pkg
                .filenames
                .iter()
                .any(|f| uri::path_equal(f, &query.file))
        {
            return Ok(());
        }
        if query.filter == FilterType::Dir && !uri::path_equal(&pkg.path, &query.dir) {
            return Ok(());
        }
        if results.len() >= limit {
            return Ok(());
        }

        collect_from_pkg(view, pkg, &query, &mut results);
        Ok(())
    });
    // Partial hits survive cancellation.
    let _ = walk;

    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.symbol.container_name.cmp(&b.symbol.container_name))
            .then_with(|| a.symbol.name.cmp(&b.symbol.name))
            .then_with(|| a.symbol.location.uri.cmp(&b.symbol.location.uri))
    });
    results.truncate(limit);

    Ok(results.into_iter().map(|s| s.symbol).collect())
}

fn root_import_path(view: &View) -> Option<String> {
    match &view.workspace {
        crate::project::Workspace::SourcePath { import_path, .. } => {
            Some(import_path.to_string())
        }
        crate::project::Workspace::Modules(_) => None,
    }
}

/// `textDocument/documentSymbol`: the symbols of a single file.
pub fn document_symbols(view: &View, path: &Path) -> Result<Vec<SymbolInformation>, IdeError> {
    let pkg = view.package_for_file(path)?;
    let file = view
        .fset
        .get_file_id(path)
        .ok_or_else(|| IdeError::NotFound(format!("file not loaded: {}", path.display())))?;
    let Some(syntax) = pkg.file_syntax(file) else {
        return Ok(Vec::new());
    };
    let mut collector = SymbolCollector {
        view,
        pkg: &pkg,
        symbols: Vec::new(),
    };
    collector.collect_file(syntax);
    Ok(collector.symbols)
}

fn collect_from_pkg(
    view: &View,
    pkg: &Package,
    query: &Query,
    results: &mut Vec<ScoredSymbol>,
) {
    let mut collector = SymbolCollector {
        view,
        pkg,
        symbols: Vec::new(),
    };
    for syntax in &pkg.syntax {
        collector.collect_file(syntax);
    }
    for symbol in collector.symbols {
        if query.filter == FilterType::Exported && !symbol_exported(&symbol) {
            continue;
        }
        let score = score(query, &symbol);
        if score > 0 {
            results.push(ScoredSymbol { score, symbol });
        }
    }
}

fn symbol_exported(symbol: &SymbolInformation) -> bool {
    if symbol.container_name.is_empty() {
        is_exported(&symbol.name)
    } else {
        is_exported(&symbol.container_name) && is_exported(&symbol.name)
    }
}

/// Collects symbol information from top-level declarations.
struct SymbolCollector<'a> {
    view: &'a View,
    pkg: &'a Package,
    symbols: Vec<SymbolInformation>,
}

impl<'a> SymbolCollector<'a> {
    fn collect_file(&mut self, file: &ast::File) {
        for decl in &file.decls {
            match decl {
                ast::Decl::Type(d) => {
                    for spec in &d.specs {
                        self.collect_type_spec(file, spec);
                    }
                }
                ast::Decl::Value(d) => {
                    let kind = match d.kind {
                        ast::ValueKind::Var => SymbolKind::Variable,
                        ast::ValueKind::Const => SymbolKind::Constant,
                    };
                    for spec in &d.specs {
                        for name in &spec.names {
                            if name.name != "_" {
                                self.add(file, &name.name, "", "", kind, name.range);
                            }
                        }
                    }
                }
                ast::Decl::Func(d) => self.collect_func(file, d),
            }
        }
    }

    fn collect_type_spec(&mut self, file: &ast::File, spec: &ast::TypeSpec) {
        if spec.name.name == "_" {
            return;
        }
        match &spec.ty {
            ast::TypeExpr::Struct { fields, .. } => {
                for field in fields {
                    for name in &field.names {
                        self.add(
                            file,
                            &name.name,
                            &spec.name.name,
                            "",
                            SymbolKind::Field,
                            name.range,
                        );
                    }
                }
                self.add(file, &spec.name.name, "", "", SymbolKind::Class, spec.name.range);
            }
            ast::TypeExpr::Interface { elems, .. } => {
                for elem in elems {
                    if let ast::InterfaceElem::Method { name, .. } = elem {
                        self.add(
                            file,
                            &name.name,
                            &spec.name.name,
                            "",
                            SymbolKind::Method,
                            name.range,
                        );
                    }
                }
                self.add(
                    file,
                    &spec.name.name,
                    "",
                    "",
                    SymbolKind::Interface,
                    spec.name.range,
                );
            }
            _ => {
                self.add(file, &spec.name.name, "", "", SymbolKind::Class, spec.name.range);
            }
        }
    }

    fn collect_func(&mut self, file: &ast::File, decl: &ast::FuncDecl) {
        if let Some(recv) = &decl.recv {
            let recv_name = recv_string(&recv.ty);
            self.add(
                file,
                &decl.name.name,
                &recv_name,
                &recv_name,
                SymbolKind::Method,
                decl.name.range,
            );
        } else {
            self.add(
                file,
                &decl.name.name,
                "",
                "",
                SymbolKind::Function,
                decl.name.range,
            );
        }
    }

    fn add(
        &mut self,
        file: &ast::File,
        name: &str,
        container: &str,
        recv: &str,
        kind: SymbolKind,
        range: TextRange,
    ) {
        let Some(loc) = location(self.view, file.file_id, range) else {
            return;
        };
        self.symbols.push(SymbolInformation {
            name: name.to_string(),
            kind,
            location: loc,
            container_name: container.to_string(),
            desc: descriptor(self.pkg, container, recv, name),
        });
    }
}

fn descriptor(pkg: &Package, container: &str, recv: &str, name: &str) -> SymbolDescriptor {
    // The container doubles as the id segment for methods and fields.
    let seg = if recv.is_empty() { container } else { recv };
    let mut desc = SymbolDescriptor::new(
        pkg.path.to_string(),
        pkg.name.to_string(),
        recv.to_string(),
        name.to_string(),
    );
    if recv.is_empty() && !container.is_empty() {
        desc.id = format!("{}/-/{}/{}", pkg.path, seg, name);
    }
    desc
}

/// The receiver's printed form: `T` or `*T`.
fn recv_string(ty: &ast::TypeExpr) -> String {
    match ty {
        ast::TypeExpr::Path(p) => p.name.name.to_string(),
        ast::TypeExpr::Pointer { elem, .. } => format!("*{}", recv_string(elem)),
        _ => "BADRECV".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LineCol;

    fn parse(q: &str) -> Query {
        Query::parse(q)
    }

    #[test]
    fn test_parse_exported_filter() {
        let q = parse("is:exported Printer");
        assert_eq!(q.filter, FilterType::Exported);
        assert_eq!(q.tokens, vec!["printer"]);
    }

    #[test]
    fn test_parse_dir_filter() {
        let q = parse("dir:internal/cache Get");
        assert_eq!(q.filter, FilterType::Dir);
        assert_eq!(q.dir, "internal/cache");
        assert_eq!(q.tokens, vec!["get"]);
    }

    #[test]
    fn test_parse_kind_keyword() {
        let q = parse("func Walk");
        assert_eq!(q.kind, Some(SymbolKind::Function));
        assert_eq!(q.tokens, vec!["walk"]);
    }

    #[test]
    fn test_parse_splits_on_dots_and_slashes() {
        let q = parse("cache.Walk");
        assert_eq!(q.tokens, vec!["cache", "walk"]);

        // kind keywords inside sub-tokens still set the kind
        let q = parse("type.User");
        assert_eq!(q.kind, Some(SymbolKind::Class));
        assert_eq!(q.tokens, vec!["user"]);
    }

    #[test]
    fn test_query_round_trip() {
        for raw in ["is:exported func walk", "dir:a/b get", "cache.walk type"] {
            let q = parse(raw);
            let reparsed = parse(&q.to_string());
            assert_eq!(q.filter, reparsed.filter);
            assert_eq!(q.kind, reparsed.kind);
            assert_eq!(q.dir, reparsed.dir);
            assert_eq!(q.tokens, reparsed.tokens);
        }
    }

    fn sym(name: &str, container: &str, uri_path: &str) -> SymbolInformation {
        SymbolInformation {
            name: name.to_string(),
            kind: SymbolKind::Function,
            location: Location {
                uri: format!("file://{uri_path}"),
                start: LineCol::new(0, 0),
                end: LineCol::new(0, 1),
            },
            container_name: container.to_string(),
            desc: SymbolDescriptor::new(
                "test/pkg".to_string(),
                "pkg".to_string(),
                String::new(),
                name.to_string(),
            ),
        }
    }

    #[test]
    fn test_score_kind_mismatch_is_zero() {
        let mut q = parse("func walk");
        q.kind = Some(SymbolKind::Class);
        assert_eq!(score(&q, &sym("walk", "", "/ws/a.go")), 0);
    }

    #[test]
    fn test_score_empty_query_is_two() {
        let q = parse("");
        assert_eq!(score(&q, &sym("Walk", "", "/ws/a.go")), 2);
    }

    #[test]
    fn test_score_exact_last_token_dominates() {
        let q = parse("walk");
        let exact = score(&q, &sym("walk", "", "/ws/a.go"));
        let prefix = score(&q, &sym("walker", "", "/ws/a.go"));
        assert!(exact > prefix);
        assert!(exact >= 50);
    }

    #[test]
    fn test_score_vendor_penalty() {
        let q = parse("walk");
        let normal = score(&q, &sym("walk", "", "/ws/a.go"));
        let vendored = score(&q, &sym("walk", "", "/ws/vendor/dep/a.go"));
        assert_eq!(normal - vendored, 5);
    }

    #[test]
    fn test_score_exported_boost() {
        let q = parse("walk");
        let exported = score(&q, &sym("Walk", "", "/ws/a.go"));
        let unexported = score(&q, &sym("walk", "", "/ws/a.go"));
        assert_eq!(exported - unexported, 1);
    }

    #[test]
    fn test_descriptor_contains() {
        let desc = SymbolDescriptor::new(
            "test/pkg".to_string(),
            "pkg".to_string(),
            "T".to_string(),
            "Get".to_string(),
        );
        assert_eq!(desc.id, "test/pkg/-/T/Get");

        let mut q = BTreeMap::new();
        q.insert("name".to_string(), Value::String("Get".to_string()));
        q.insert("recv".to_string(), Value::String("T".to_string()));
        assert!(desc.contains(&q));

        q.insert("package".to_string(), Value::String("other".to_string()));
        assert!(!desc.contains(&q));
    }
}
