//! Implementation search buckets over a fixture workspace.

mod common;

use golangd::ide::{implementation, ImplementationLocation, RequestCtx};

const IFACE_SRC: &str = "package p\n\n\
type Sizer interface {\n\tSize() int\n}\n\n\
type File struct{}\n\n\
func (f File) Size() int { return 0 }\n\n\
type Buf struct{}\n\n\
func (b *Buf) Size() int { return 1 }\n\n\
type Plain struct{}\n";

fn impls(
    fixture: &common::Fixture,
    rel: &str,
    needle: &str,
    offset: usize,
) -> Vec<ImplementationLocation> {
    let view = fixture.view();
    let ctx = RequestCtx::new();
    let (line, col) = fixture.position(rel, needle, offset);
    implementation(&view, &ctx, &fixture.path(rel), line, col).expect("implementation")
}

#[test]
fn test_interface_to_concrete_types() {
    let fixture = common::workspace(&[("iface/a.go", IFACE_SRC)]);
    let got = impls(&fixture, "iface/a.go", "Sizer interface", 0);

    // sorted by printed type: `*test/pkg/iface.Buf` before `test/pkg/iface.File`
    let summary: Vec<(String, &str, bool)> = got
        .iter()
        .map(|i| (fixture.loc_str(&i.location), i.typ, i.ptr))
        .collect();
    let (bline, bcol) = fixture.position("iface/a.go", "Buf struct", 0);
    let (fline, fcol) = fixture.position("iface/a.go", "File struct", 0);
    assert_eq!(
        summary,
        vec![
            (
                format!("gopath/src/test/pkg/iface/a.go:{}:{}", bline + 1, bcol + 1),
                "to",
                true
            ),
            (
                format!("gopath/src/test/pkg/iface/a.go:{}:{}", fline + 1, fcol + 1),
                "to",
                false
            ),
        ]
    );
    assert!(got.iter().all(|i| !i.method));
}

#[test]
fn test_concrete_to_interfaces() {
    let fixture = common::workspace(&[("iface/a.go", IFACE_SRC)]);

    // File implements Sizer by value
    let got = impls(&fixture, "iface/a.go", "File struct", 0);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].typ, "from");
    assert!(!got[0].ptr);

    // Buf implements Sizer only through its pointer form
    let got = impls(&fixture, "iface/a.go", "Buf struct", 0);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].typ, "from");
    assert!(got[0].ptr);

    // Plain implements nothing
    let got = impls(&fixture, "iface/a.go", "Plain struct", 0);
    assert!(got.is_empty());
}

#[test]
fn test_method_query_projects_to_method_sites() {
    let fixture = common::workspace(&[("iface/a.go", IFACE_SRC)]);
    // cursor on the interface method declaration
    let got = impls(&fixture, "iface/a.go", "Size() int\n}", 0);
    assert_eq!(got.len(), 2);
    assert!(got.iter().all(|i| i.method && i.typ == "to"));

    // each result points at a concrete Size method declaration
    let locs: Vec<String> = got.iter().map(|i| fixture.loc_str(&i.location)).collect();
    let (l1, c1) = fixture.position("iface/a.go", "Size() int { return 1 }", 0);
    let (l2, c2) = fixture.position("iface/a.go", "Size() int { return 0 }", 0);
    assert_eq!(
        locs,
        vec![
            format!("gopath/src/test/pkg/iface/a.go:{}:{}", l1 + 1, c1 + 1),
            format!("gopath/src/test/pkg/iface/a.go:{}:{}", l2 + 1, c2 + 1),
        ]
    );
}

#[test]
fn test_empty_interface_short_circuits() {
    let fixture = common::workspace(&[(
        "iface/a.go",
        "package p\n\ntype Any interface{}\n\ntype T struct{}\n",
    )]);
    let got = impls(&fixture, "iface/a.go", "Any interface", 0);
    assert!(got.is_empty());
}

#[test]
fn test_error_interface_is_included() {
    let fixture = common::workspace(&[(
        "iface/a.go",
        "package p\n\ntype MyErr struct{}\n\nfunc (e MyErr) Error() string { return \"\" }\n",
    )]);
    let got = impls(&fixture, "iface/a.go", "MyErr struct", 0);
    // MyErr implements the built-in error interface; error's declaration
    // site lives in the loaded builtin package
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].typ, "from");
    assert!(fixture
        .loc_str(&got[0].location)
        .starts_with("goroot/src/builtin/builtin.go:"));
}
