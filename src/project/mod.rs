//! The workspace model: configuration, classification, package loading,
//! caching, the view, and filesystem watching.

pub mod builtin;
pub mod cache;
pub mod config;
pub mod loader;
pub mod package;
pub mod view;
pub mod watcher;
pub mod workspace;

pub use cache::{CanceledError, PackageCache};
pub use config::{Config, ModuleMode};
pub use loader::LoadError;
pub use package::{Package, BUILTIN_PKG};
pub use view::{AnalysisHost, View};
pub use workspace::{classify, ClassifyError, Module, Workspace, MANIFEST};
