//! Watches the application directory and feeds debounced change batches to
//! the build scheduler.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ServerResult;

pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Directory names whose contents never trigger a build.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Keeps the watcher alive. Drop to stop watching.
pub struct SourceWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

/// Start watching `root` recursively. Paths under `ignored` (typically the
/// data directory) and under [`IGNORED_DIRS`] are filtered out.
pub fn watch(
    root: &Path,
    ignored: Vec<PathBuf>,
    changes: mpsc::Sender<Vec<PathBuf>>,
) -> ServerResult<SourceWatcher> {
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let paths = relevant(
                events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path),
                &ignored,
            );
            if paths.is_empty() {
                return;
            }
            // The debouncer thread is not a tokio worker, so a blocking send is fine.
            if changes.blocking_send(paths).is_err() {
                debug!("scheduler gone, dropping change batch");
            }
        }
        Err(e) => warn!(error = %e, "file watcher error"),
    })?;

    debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), debounce_ms = DEBOUNCE.as_millis() as u64, "watching for changes");

    Ok(SourceWatcher {
        _debouncer: debouncer,
    })
}

/// Changed paths worth a rebuild, deduplicated in arrival order.
fn relevant(paths: impl IntoIterator<Item = PathBuf>, ignored: &[PathBuf]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for path in paths {
        if should_ignore(&path, ignored) || out.contains(&path) {
            continue;
        }
        out.push(path);
    }
    out
}

fn should_ignore(path: &Path, ignored: &[PathBuf]) -> bool {
    if ignored.iter().any(|dir| path.starts_with(dir)) {
        return true;
    }
    path.components().any(|c| match c {
        Component::Normal(name) => IGNORED_DIRS.iter().any(|d| name == *d),
        _ => false,
    })
}
