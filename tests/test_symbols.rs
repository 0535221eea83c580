//! Workspace/document symbol search and signature help.

mod common;

use golangd::ide::{
    document_symbols, signature_help, workspace_symbols, RequestCtx, SymbolKind,
};

const SYMBOLS_SRC: &str = "package s\n\n\
type User struct {\n\tName string\n\tage int\n}\n\n\
type Sizer interface {\n\tSize() int\n}\n\n\
func (u User) Size() int { return 0 }\n\n\
func NewUser() User { return User{} }\n\n\
var DefaultUser = NewUser()\n\n\
const maxUsers = 10\n";

fn fixture() -> common::Fixture {
    common::workspace(&[("s/a.go", SYMBOLS_SRC)])
}

fn search(fixture: &common::Fixture, query: &str) -> Vec<(String, SymbolKind, String)> {
    let view = fixture.view();
    let ctx = RequestCtx::new();
    workspace_symbols(&view, &ctx, query, None, 0)
        .expect("workspace symbols")
        .into_iter()
        .map(|s| (s.name, s.kind, s.container_name))
        .collect()
}

#[test]
fn test_exact_name_ranks_first() {
    let fixture = fixture();
    let got = search(&fixture, "User");
    assert!(!got.is_empty());
    assert_eq!(got[0].0, "User");
    assert_eq!(got[0].1, SymbolKind::Class);
}

#[test]
fn test_kind_keyword_filters() {
    let fixture = fixture();
    let got = search(&fixture, "func new");
    assert!(got.iter().all(|(_, kind, _)| *kind == SymbolKind::Function));
    assert!(got.iter().any(|(name, _, _)| name == "NewUser"));

    let got = search(&fixture, "method size");
    assert!(got.iter().all(|(_, kind, _)| *kind == SymbolKind::Method));
}

#[test]
fn test_exported_filter() {
    let fixture = fixture();
    let got = search(&fixture, "is:exported user");
    assert!(got.iter().any(|(name, _, _)| name == "User"));
    assert!(got.iter().all(|(name, _, _)| name != "maxUsers"));
}

#[test]
fn test_dir_filter_restricts_to_package() {
    let fixture = common::workspace(&[
        ("s/a.go", "package s\n\nfunc Alpha() {}\n"),
        ("t/b.go", "package t\n\nfunc AlphaToo() {}\n"),
    ]);
    let got = search(&fixture, "dir:s alpha");
    assert!(got.iter().any(|(name, _, _)| name == "Alpha"));
    assert!(got.iter().all(|(name, _, _)| name != "AlphaToo"));
}

#[test]
fn test_struct_fields_and_interface_methods_are_children() {
    let fixture = fixture();
    let got = search(&fixture, "");
    // empty query scores everything equally; containment is what matters
    let field = got
        .iter()
        .find(|(name, _, _)| name == "Name")
        .expect("field symbol");
    assert_eq!(field.1, SymbolKind::Field);
    assert_eq!(field.2, "User");

    let method = got
        .iter()
        .find(|(name, kind, _)| name == "Size" && *kind == SymbolKind::Method)
        .expect("interface method symbol");
    assert_eq!(method.2, "Sizer");

    let iface = got
        .iter()
        .find(|(name, _, _)| name == "Sizer")
        .expect("interface symbol");
    assert_eq!(iface.1, SymbolKind::Interface);
}

#[test]
fn test_receiver_is_method_container() {
    let fixture = fixture();
    let got = search(&fixture, "size method");
    let on_user = got
        .iter()
        .find(|(_, _, container)| container == "User")
        .expect("method on User");
    assert_eq!(on_user.0, "Size");
}

#[test]
fn test_limit_truncates() {
    let fixture = fixture();
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let got = workspace_symbols(&view, &ctx, "", None, 3).expect("workspace symbols");
    assert_eq!(got.len(), 3);
}

#[test]
fn test_vars_and_consts_keep_block_kind() {
    let fixture = fixture();
    let got = search(&fixture, "");
    assert!(got
        .iter()
        .any(|(name, kind, _)| name == "DefaultUser" && *kind == SymbolKind::Variable));
    assert!(got
        .iter()
        .any(|(name, kind, _)| name == "maxUsers" && *kind == SymbolKind::Constant));
}

#[test]
fn test_document_symbols_single_file() {
    let fixture = common::workspace(&[
        ("s/a.go", "package s\n\nfunc InA() {}\n"),
        ("s/b.go", "package s\n\nfunc InB() {}\n"),
    ]);
    let view = fixture.view();
    let symbols = document_symbols(&view, &fixture.path("s/a.go")).expect("document symbols");
    let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["InA"]);
}

#[test]
fn test_signature_help_inside_call() {
    let fixture = common::workspace(&[(
        "sig/a.go",
        "package p\n\n// Greet renders a greeting.\nfunc Greet(name string, times int) string { return name }\n\nvar V = Greet(\"x\", 2)\n",
    )]);
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let (line, col) = fixture.position("sig/a.go", "\"x\", 2", 5);
    let help = signature_help(&view, &ctx, &fixture.path("sig/a.go"), line, col)
        .expect("signature help")
        .expect("inside a call");
    assert_eq!(help.label, "func(name string, times int) string");
    assert_eq!(help.parameters, vec!["name string", "times int"]);
    assert_eq!(help.active_parameter, 1);
    assert!(help
        .documentation
        .as_deref()
        .is_some_and(|d| d.contains("Greet renders")));
}
