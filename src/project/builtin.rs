//! Loading the builtin namespace.
//!
//! The builtin package is ordinary source living in a fixed subdirectory
//! of the toolchain install tree. It is loaded with module mode forced to
//! auto, mirroring how the original toolchain resolves it regardless of
//! the workspace's module setting.

use std::sync::Arc;

use tracing::warn;

use super::loader;
use super::package::BUILTIN_PKG;
use super::view::View;

/// Load `<goroot>/src/builtin` into the cache.
pub fn load_builtin(view: &View) {
    let dir = view.config.with_auto_modules().goroot_src().join(BUILTIN_PKG);
    if !dir.is_dir() {
        warn!("builtin package directory missing: {}", dir.display());
        return;
    }
    let mut stack = vec![Arc::from(BUILTIN_PKG)];
    match loader::load_dir(view, &dir, BUILTIN_PKG, false, &mut stack) {
        Ok(pkgs) => {
            for pkg in &pkgs {
                view.cache.put(pkg);
            }
        }
        Err(err) => warn!("load builtin: {}", err),
    }
}
