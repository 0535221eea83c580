//! Shared fixture workspace for the engine tests.
#![allow(dead_code)]
//!
//! Builds a temp directory holding a miniature toolchain root (with the
//! `builtin` and `fmt` packages) and a source-path workspace rooted at
//! `gopath/src/test/pkg`, then initializes an analysis host over it.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use golangd::base::uri;
use golangd::ide::Location;
use golangd::project::{AnalysisHost, Config, View};

const BUILTIN_SRC: &str = r#"package builtin

// Type is here for the purposes of documentation only.
type Type int

// error is the interface for representing error conditions.
type error interface {
	Error() string
}

// len returns the length of v.
func len(v Type) int

// cap returns the capacity of v.
func cap(v Type) int

func make(t Type, size int) Type

func new(t Type) *Type

func append(slice Type, elems Type) Type
"#;

const FMT_SRC: &str = r#"package fmt

// Println formats using the default formats for its operands and
// writes to standard output.
func Println(a string) int { return len(a) }
"#;

pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub host: AnalysisHost,
    pub root: PathBuf,
}

/// A source-path workspace at `gopath/src/test/pkg` with the given
/// files (paths relative to the workspace root).
pub fn workspace(files: &[(&str, &str)]) -> Fixture {
    let tmp = tempfile::tempdir().expect("tempdir");
    let goroot = tmp.path().join("goroot");
    let gopath = tmp.path().join("gopath");

    fs::create_dir_all(goroot.join("src/builtin")).unwrap();
    fs::write(goroot.join("src/builtin/builtin.go"), BUILTIN_SRC).unwrap();
    fs::create_dir_all(goroot.join("src/fmt")).unwrap();
    fs::write(goroot.join("src/fmt/print.go"), FMT_SRC).unwrap();

    let root = gopath.join("src/test/pkg");
    fs::create_dir_all(&root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let host = AnalysisHost::new(root.clone(), Config::with_roots(&goroot, &gopath))
        .expect("classify workspace");
    host.initialize();
    Fixture { tmp, host, root }
}

/// A module-mode workspace at `ws/` with a manifest, plus dependency
/// sources under the module download cache.
pub fn module_workspace(
    module_path: &str,
    files: &[(&str, &str)],
    cached_deps: &[(&str, &str)],
) -> Fixture {
    let tmp = tempfile::tempdir().expect("tempdir");
    let goroot = tmp.path().join("goroot");
    let gopath = tmp.path().join("gopath");

    fs::create_dir_all(goroot.join("src/builtin")).unwrap();
    fs::write(goroot.join("src/builtin/builtin.go"), BUILTIN_SRC).unwrap();

    let root = tmp.path().join("ws");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("go.mod"), format!("module {module_path}\n")).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    for (rel, content) in cached_deps {
        let path = gopath.join("pkg/mod").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let host = AnalysisHost::new(root.clone(), Config::with_roots(&goroot, &gopath))
        .expect("classify workspace");
    host.initialize();
    Fixture { tmp, host, root }
}

impl Fixture {
    pub fn view(&self) -> Arc<View> {
        self.host.snapshot()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// 0-based `(line, character)` of the `offset`th byte of the first
    /// occurrence of `needle` in a workspace file.
    pub fn position(&self, rel: &str, needle: &str, offset: usize) -> (u32, u32) {
        let content = fs::read_to_string(self.path(rel)).expect("fixture file");
        let at = content.find(needle).expect("needle present") + offset;
        let before = &content[..at];
        let line = before.matches('\n').count() as u32;
        let col = before
            .rsplit('\n')
            .next()
            .map(|l| l.len())
            .unwrap_or(at) as u32;
        (line, col)
    }

    /// Format a location as `<path-relative-to-tmp>:<line>:<col>`,
    /// 1-based, forward slashes.
    pub fn loc_str(&self, loc: &Location) -> String {
        let path = uri::uri_to_path(&loc.uri).expect("file uri");
        let rel = path
            .strip_prefix(self.tmp.path())
            .map(|p| p.to_path_buf())
            .unwrap_or(path);
        format!(
            "{}:{}:{}",
            rel.to_string_lossy().replace('\\', "/"),
            loc.start.line_one_indexed(),
            loc.start.col_one_indexed()
        )
    }

    /// Locations formatted and sorted, goroot results filtered out the
    /// way a client filters toolchain noise.
    pub fn workspace_locs(&self, locs: &[Location]) -> Vec<String> {
        let mut out: Vec<String> = locs
            .iter()
            .map(|l| self.loc_str(l))
            .filter(|s| !s.starts_with("goroot/"))
            .collect();
        out.sort();
        out
    }
}
