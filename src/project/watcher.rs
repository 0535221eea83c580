//! Filesystem watching and cache invalidation.
//!
//! The watcher runs on its own thread, feeding raw notifications through
//! a channel into a debounce policy: editor lock files and non-source
//! files are ignored, overlay-resident files are authoritative already,
//! and batched changes only trigger a rebuild once more than twenty have
//! accumulated or a minute has passed. A manifest change always rebuilds
//! immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing::{debug, warn};

use super::view::AnalysisHost;
use super::workspace::MANIFEST;

/// Editor lock files, skipped outright.
const LOCK_PREFIX: &str = ".#";

/// Source file extension the watcher cares about.
const SOURCE_EXT: &str = ".go";

/// Changes accumulated before a rebuild triggers.
const REBUILD_COUNT: usize = 20;

/// Time since the last rebuild after which any change triggers one.
const REBUILD_INTERVAL: Duration = Duration::from_secs(60);

/// What the debounce policy decided for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    /// Counter or interval threshold crossed.
    Rebuild,
    /// Manifest change: rebuild without debouncing.
    RebuildNow,
}

/// Pure debounce state, separated from the watcher thread for testing.
#[derive(Debug)]
pub struct DebouncePolicy {
    changed_count: usize,
    last_build: Instant,
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self {
            changed_count: 0,
            last_build: Instant::now(),
        }
    }
}

impl DebouncePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one filesystem event.
    pub fn decide(&mut self, path: &Path, in_overlay: bool) -> Decision {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Decision::Skip;
        };

        if name == MANIFEST {
            self.mark_rebuilt();
            return Decision::RebuildNow;
        }
        if name.starts_with(LOCK_PREFIX) {
            return Decision::Skip;
        }
        if !name.ends_with(SOURCE_EXT) {
            return Decision::Skip;
        }
        if in_overlay {
            // The overlay is authoritative for open buffers.
            return Decision::Skip;
        }

        self.changed_count += 1;
        if self.changed_count > REBUILD_COUNT
            || self.last_build.elapsed() >= REBUILD_INTERVAL
        {
            self.mark_rebuilt();
            return Decision::Rebuild;
        }
        Decision::Skip
    }

    fn mark_rebuilt(&mut self) {
        self.changed_count = 0;
        self.last_build = Instant::now();
    }
}

/// The running watcher; dropping it stops watching.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

/// Watch the workspace root and drive invalidation on the host.
pub fn spawn(host: Arc<AnalysisHost>) -> notify::Result<FsWatcher> {
    let root = host.snapshot().root.clone();
    let (tx, rx) = unbounded::<PathBuf>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Err(err) => warn!("watch error: {}", err),
        }
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    std::thread::spawn(move || watch_loop(host, rx));

    Ok(FsWatcher { _watcher: watcher })
}

fn watch_loop(host: Arc<AnalysisHost>, rx: Receiver<PathBuf>) {
    let mut policy = DebouncePolicy::new();
    for path in rx {
        let view = host.snapshot();
        let decision = policy.decide(&path, view.overlay_contains(&path));
        match decision {
            Decision::Skip => {}
            Decision::Rebuild | Decision::RebuildNow => {
                debug!("fsnotify {}", path.display());
                view.rebuild_for_path(&path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_files_skipped() {
        let mut policy = DebouncePolicy::new();
        assert_eq!(
            policy.decide(Path::new("/ws/.#a.go"), false),
            Decision::Skip
        );
    }

    #[test]
    fn test_non_source_files_skipped() {
        let mut policy = DebouncePolicy::new();
        assert_eq!(
            policy.decide(Path::new("/ws/readme.md"), false),
            Decision::Skip
        );
        assert_eq!(
            policy.decide(Path::new("/ws/a.go.swp"), false),
            Decision::Skip
        );
    }

    #[test]
    fn test_overlay_files_skipped() {
        let mut policy = DebouncePolicy::new();
        assert_eq!(policy.decide(Path::new("/ws/a.go"), true), Decision::Skip);
    }

    #[test]
    fn test_manifest_rebuilds_immediately() {
        let mut policy = DebouncePolicy::new();
        assert_eq!(
            policy.decide(Path::new("/ws/go.mod"), false),
            Decision::RebuildNow
        );
    }

    #[test]
    fn test_counter_threshold() {
        let mut policy = DebouncePolicy::new();
        for _ in 0..REBUILD_COUNT {
            assert_eq!(
                policy.decide(Path::new("/ws/a.go"), false),
                Decision::Skip
            );
        }
        // change number twenty-one crosses the threshold
        assert_eq!(
            policy.decide(Path::new("/ws/a.go"), false),
            Decision::Rebuild
        );
        // and the counter resets
        assert_eq!(policy.decide(Path::new("/ws/a.go"), false), Decision::Skip);
    }

    #[test]
    fn test_interval_threshold() {
        let mut policy = DebouncePolicy::new();
        policy.last_build = Instant::now() - REBUILD_INTERVAL;
        assert_eq!(
            policy.decide(Path::new("/ws/a.go"), false),
            Decision::Rebuild
        );
    }
}
