//! Environment configuration.
//!
//! The toolchain install root and source-path roots are read from the
//! environment once at startup and threaded through the view as a plain
//! record, so tests can construct arbitrary workspaces without touching
//! process globals.

use std::env;
use std::path::{Path, PathBuf};

/// Module-mode switch, mirroring the `GO111MODULE` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleMode {
    On,
    Off,
    #[default]
    Auto,
}

impl ModuleMode {
    fn parse(value: &str) -> Self {
        match value {
            "on" => ModuleMode::On,
            "off" => ModuleMode::Off,
            _ => ModuleMode::Auto,
        }
    }
}

/// Startup configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Toolchain install root; sources live under `<goroot>/src`.
    pub goroot: PathBuf,
    /// Source-path roots; packages live under `<gopath>/src`.
    pub gopaths: Vec<PathBuf>,
    pub module_mode: ModuleMode,
    /// Background type-check of the whole workspace on initialize.
    pub warmup_on_initialize: bool,
    /// Bound on concurrent request workers; `None` means one per CPU.
    pub max_parallelism: Option<usize>,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        let goroot = env::var_os("GOROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/usr/local/go"));

        let gopaths = match env::var("GOPATH") {
            Ok(v) if !v.is_empty() => env::split_paths(&v).collect(),
            _ => {
                let home = env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/"));
                vec![home.join("go")]
            }
        };

        let module_mode = ModuleMode::parse(&env::var("GO111MODULE").unwrap_or_default());

        let warmup_on_initialize = env::var("GOLSP_WARMUP_ON_INITIALIZE")
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        Self {
            goroot,
            gopaths,
            module_mode,
            warmup_on_initialize,
            max_parallelism: None,
        }
    }

    /// A configuration rooted at explicit paths, for tests.
    pub fn with_roots(goroot: impl Into<PathBuf>, gopath: impl Into<PathBuf>) -> Self {
        Self {
            goroot: goroot.into(),
            gopaths: vec![gopath.into()],
            module_mode: ModuleMode::Auto,
            warmup_on_initialize: false,
            max_parallelism: None,
        }
    }

    /// The toolchain source tree: `<goroot>/src`.
    pub fn goroot_src(&self) -> PathBuf {
        self.goroot.join("src")
    }

    /// The module download cache: `<gopath>/pkg/mod`.
    pub fn module_cache(&self) -> Option<PathBuf> {
        self.gopaths.first().map(|p| p.join("pkg").join("mod"))
    }

    /// Whether `path` lies under the toolchain source tree.
    pub fn is_under_goroot(&self, path: &Path) -> bool {
        path.starts_with(self.goroot_src())
    }

    /// A copy with module mode forced to auto, used while loading the
    /// builtin namespace.
    pub fn with_auto_modules(&self) -> Self {
        let mut copy = self.clone();
        copy.module_mode = ModuleMode::Auto;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_roots() {
        let config = Config::with_roots("/opt/go", "/home/dev/go");
        assert_eq!(config.goroot_src(), PathBuf::from("/opt/go/src"));
        assert_eq!(
            config.module_cache(),
            Some(PathBuf::from("/home/dev/go/pkg/mod"))
        );
        assert!(config.is_under_goroot(Path::new("/opt/go/src/fmt")));
        assert!(!config.is_under_goroot(Path::new("/home/dev/go/src/x")));
    }

    #[test]
    fn test_module_mode_parse() {
        assert_eq!(ModuleMode::parse("on"), ModuleMode::On);
        assert_eq!(ModuleMode::parse("off"), ModuleMode::Off);
        assert_eq!(ModuleMode::parse(""), ModuleMode::Auto);
        assert_eq!(ModuleMode::parse("auto"), ModuleMode::Auto);
    }
}
