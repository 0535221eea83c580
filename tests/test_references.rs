//! Reference search over a fixture workspace.
//!
//! Covers the cross-package import filter, the builtin bypass, the
//! test-variant duplicate rule, and the off-by-one retry.

mod common;

use golangd::ide::{references, RequestCtx};

fn refs(fixture: &common::Fixture, rel: &str, line: u32, character: u32) -> Vec<String> {
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let locs = references(
        &view,
        &ctx,
        &fixture.path(rel),
        line,
        character,
        true,
        0,
    )
    .expect("references");
    fixture.workspace_locs(&locs)
}

fn basic_fixture() -> common::Fixture {
    common::workspace(&[
        ("basic/a.go", "package p; func A() { A() }"),
        ("basic/b.go", "package p; func B() { A() }"),
    ])
}

#[test]
fn test_basic_references_from_definition() {
    let fixture = basic_fixture();
    // cursor on the definition of A (1:17 one-based)
    let got = refs(&fixture, "basic/a.go", 0, 16);
    assert_eq!(
        got,
        vec![
            "gopath/src/test/pkg/basic/a.go:1:17",
            "gopath/src/test/pkg/basic/a.go:1:23",
            "gopath/src/test/pkg/basic/b.go:1:23",
        ]
    );
}

#[test]
fn test_basic_references_from_use() {
    let fixture = basic_fixture();
    let got = refs(&fixture, "basic/b.go", 0, 22);
    assert_eq!(
        got,
        vec![
            "gopath/src/test/pkg/basic/a.go:1:17",
            "gopath/src/test/pkg/basic/a.go:1:23",
            "gopath/src/test/pkg/basic/b.go:1:23",
        ]
    );
}

#[test]
fn test_unreferenced_function_returns_only_declaration() {
    let fixture = basic_fixture();
    let got = refs(&fixture, "basic/b.go", 0, 16);
    assert_eq!(got, vec!["gopath/src/test/pkg/basic/b.go:1:17"]);
}

#[test]
fn test_builtin_references_have_no_declaration_site() {
    let fixture = common::workspace(&[(
        "builtin/a.go",
        "package p; func A() { len(\"x\") }",
    )]);
    // cursor at the call paren (1:26): the resolver unwraps the call
    let got = refs(&fixture, "builtin/a.go", 0, 25);
    // the builtin's own declaration has an invalid position and is
    // dropped; only the workspace use remains
    assert_eq!(got, vec!["gopath/src/test/pkg/builtin/a.go:1:23"]);
}

#[test]
fn test_xtest_variants_are_reconciled() {
    let fixture = common::workspace(&[
        ("xtest/a.go", "package x; var A = 1"),
        ("xtest/a_test.go", "package x; var X = A"),
        (
            "xtest/x_test.go",
            "package x_test; import \"test/pkg/xtest\"; var B = x.A",
        ),
    ]);
    // query on the definition of A (1:16)
    let got = refs(&fixture, "xtest/a.go", 0, 15);
    let (line, col) = fixture.position("xtest/x_test.go", "x.A", 2);
    assert_eq!(
        got,
        vec![
            "gopath/src/test/pkg/xtest/a.go:1:16".to_string(),
            "gopath/src/test/pkg/xtest/a_test.go:1:20".to_string(),
            format!(
                "gopath/src/test/pkg/xtest/x_test.go:{}:{}",
                line + 1,
                col + 1
            ),
        ]
    );
}

#[test]
fn test_cross_package_import_filter() {
    let fixture = common::workspace(&[
        ("a/a.go", "package a; func Shared() { Shared() }"),
        (
            "b/b.go",
            "package b; import \"test/pkg/a\"; var V = a.Shared",
        ),
        // c does not import a, so its same-named local never matches
        ("c/c.go", "package c; func Shared() { Shared() }"),
    ]);
    let (line, col) = fixture.position("a/a.go", "Shared", 0);
    let got = refs(&fixture, "a/a.go", line, col);
    let (bline, bcol) = fixture.position("b/b.go", "a.Shared", 2);
    assert_eq!(
        got,
        vec![
            "gopath/src/test/pkg/a/a.go:1:17".to_string(),
            "gopath/src/test/pkg/a/a.go:1:28".to_string(),
            format!("gopath/src/test/pkg/b/b.go:{}:{}", bline + 1, bcol + 1),
        ]
    );
}

#[test]
fn test_off_by_one_retry_at_identifier_end() {
    let fixture = basic_fixture();
    // cursor just past the end of `A` in the definition: 1:18
    let got = refs(&fixture, "basic/a.go", 0, 17);
    assert_eq!(
        got,
        vec![
            "gopath/src/test/pkg/basic/a.go:1:17",
            "gopath/src/test/pkg/basic/a.go:1:23",
            "gopath/src/test/pkg/basic/b.go:1:23",
        ]
    );
}

#[test]
fn test_xlimit_truncates() {
    let fixture = basic_fixture();
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let locs = references(&view, &ctx, &fixture.path("basic/a.go"), 0, 16, true, 2)
        .expect("references");
    assert_eq!(locs.len(), 2);
}

#[test]
fn test_cursor_on_comment_returns_empty() {
    let fixture = common::workspace(&[(
        "basic/a.go",
        "package p // trailing comment\nfunc A() {}\n",
    )]);
    let view = fixture.view();
    let ctx = RequestCtx::new();
    // inside the comment
    let result = references(&view, &ctx, &fixture.path("basic/a.go"), 0, 14, true, 0);
    match result {
        Err(err) => assert!(err.is_empty_result()),
        Ok(locs) => assert!(locs.is_empty()),
    }
}
