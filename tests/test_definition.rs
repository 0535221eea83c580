//! Definition, type definition, and xdefinition over fixture workspaces.

mod common;

use golangd::ide::{definition, type_definition, xdefinition, RequestCtx};

fn defs(fixture: &common::Fixture, rel: &str, line: u32, character: u32) -> Vec<String> {
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let locs = definition(&view, &ctx, &fixture.path(rel), line, character)
        .expect("definition");
    locs.iter().map(|l| fixture.loc_str(l)).collect()
}

#[test]
fn test_definition_within_package() {
    let fixture = common::workspace(&[
        ("basic/a.go", "package p; func A() { A() }"),
        ("basic/b.go", "package p; func B() { A() }"),
    ]);
    // use → definition
    assert_eq!(
        defs(&fixture, "basic/b.go", 0, 22),
        vec!["gopath/src/test/pkg/basic/a.go:1:17"]
    );
    // definition → itself
    assert_eq!(
        defs(&fixture, "basic/a.go", 0, 16),
        vec!["gopath/src/test/pkg/basic/a.go:1:17"]
    );
}

#[test]
fn test_definition_across_packages() {
    let fixture = common::workspace(&[
        ("a/a.go", "package a; func Exported() {}"),
        (
            "b/b.go",
            "package b; import \"test/pkg/a\"; var V = a.Exported",
        ),
    ]);
    let (line, col) = fixture.position("b/b.go", "a.Exported", 2);
    let (dline, dcol) = fixture.position("a/a.go", "Exported", 0);
    assert_eq!(
        defs(&fixture, "b/b.go", line, col),
        vec![format!(
            "gopath/src/test/pkg/a/a.go:{}:{}",
            dline + 1,
            dcol + 1
        )]
    );
}

#[test]
fn test_definition_into_toolchain_root() {
    let fixture = common::workspace(&[(
        "gorootpkg/a.go",
        "package p; import \"fmt\"; var V = fmt.Println",
    )]);
    let (line, col) = fixture.position("gorootpkg/a.go", "fmt.Println", 4);
    let got = defs(&fixture, "gorootpkg/a.go", line, col);
    assert_eq!(got.len(), 1);
    assert!(
        got[0].starts_with("goroot/src/fmt/print.go:"),
        "expected a location in the toolchain fmt package, got {}",
        got[0]
    );
}

#[test]
fn test_definition_of_builtin_redirects_into_builtin_package() {
    let fixture = common::workspace(&[(
        "builtin/a.go",
        "package p; func A() int { return len(\"x\") }",
    )]);
    let (line, col) = fixture.position("builtin/a.go", "len", 0);
    let got = defs(&fixture, "builtin/a.go", line, col);
    assert_eq!(got.len(), 1);
    assert!(
        got[0].starts_with("goroot/src/builtin/builtin.go:"),
        "expected the builtin declaration site, got {}",
        got[0]
    );
}

#[test]
fn test_definition_in_module_mode_dependency() {
    let fixture = common::module_workspace(
        "example.com/m",
        &[(
            "c.go",
            "package m; import \"dep.io/dep1\"; var V = dep1.D1",
        )],
        &[("dep.io/dep1/d1.go", "package dep1; var D1 = 1")],
    );
    let (line, col) = fixture.position("c.go", "dep1.D1", 5);
    let got = defs(&fixture, "c.go", line, col);
    assert_eq!(got.len(), 1);
    assert!(
        got[0].starts_with("gopath/pkg/mod/dep.io/dep1/d1.go:"),
        "expected the module-cache definition, got {}",
        got[0]
    );
}

#[test]
fn test_embedded_field_jumps_to_type() {
    let fixture = common::workspace(&[(
        "embed/a.go",
        "package p; type Base struct{ N int }; type Outer struct { Base }",
    )]);
    let (line, col) = fixture.position("embed/a.go", "{ Base }", 2);
    let (dline, dcol) = fixture.position("embed/a.go", "Base struct", 0);
    assert_eq!(
        defs(&fixture, "embed/a.go", line, col),
        vec![format!(
            "gopath/src/test/pkg/embed/a.go:{}:{}",
            dline + 1,
            dcol + 1
        )]
    );
}

#[test]
fn test_type_definition_of_variable() {
    let fixture = common::workspace(&[(
        "lookup/a.go",
        "package p; type T struct{}; func F() T { return T{} }; var V = F()",
    )]);
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let (line, col) = fixture.position("lookup/a.go", "V = F()", 0);
    let locs = type_definition(&view, &ctx, &fixture.path("lookup/a.go"), line, col)
        .expect("type definition");
    let (dline, dcol) = fixture.position("lookup/a.go", "T struct", 0);
    assert_eq!(
        locs.iter().map(|l| fixture.loc_str(l)).collect::<Vec<_>>(),
        vec![format!(
            "gopath/src/test/pkg/lookup/a.go:{}:{}",
            dline + 1,
            dcol + 1
        )]
    );
}

#[test]
fn test_off_by_one_retry_after_identifier() {
    let fixture = common::workspace(&[(
        "retry/a.go",
        "package p; var Alpha = 1; var Beta = Alpha",
    )]);
    // cursor immediately after the final `Alpha`, where no node sits
    let (line, col) = fixture.position("retry/a.go", "= Alpha", 7);
    let (dline, dcol) = fixture.position("retry/a.go", "Alpha", 0);
    assert_eq!(
        defs(&fixture, "retry/a.go", line, col),
        vec![format!(
            "gopath/src/test/pkg/retry/a.go:{}:{}",
            dline + 1,
            dcol + 1
        )]
    );
}

#[test]
fn test_xdefinition_descriptor() {
    let fixture = common::workspace(&[(
        "desc/a.go",
        "package d; type T struct{}; func (t T) Get() int { return 0 }; var V = T{}.Get",
    )]);
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let (line, col) = fixture.position("desc/a.go", ".Get", 1);
    let symbols = xdefinition(&view, &ctx, &fixture.path("desc/a.go"), line, col)
        .expect("xdefinition");
    assert_eq!(symbols.len(), 1);
    let desc = symbols[0].symbol.as_ref().expect("descriptor");
    assert_eq!(desc.name, "Get");
    assert_eq!(desc.recv, "T");
    assert_eq!(desc.package, "test/pkg/desc");
    assert_eq!(desc.package_name, "d");
    assert_eq!(desc.id, "test/pkg/desc/-/T/Get");
}
