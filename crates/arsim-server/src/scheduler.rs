//! Runs builds in response to source changes, one at a time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::livereload::LiveReloadEvent;
use crate::session::Session;

/// Outcome of a build request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildRun {
    Completed,
    Failed,
    /// Another build held the slot; the request was dropped.
    Skipped,
}

/// Build the entry once unless a build is already running.
///
/// A request that arrives mid-build is dropped, not queued. The next change
/// starts a fresh build that sees every edit made so far.
pub async fn try_start_build(session: &Session) -> BuildRun {
    let Some(_slot) = session.try_begin_build() else {
        debug!("build already in progress, change dropped");
        return BuildRun::Skipped;
    };

    session.publish(LiveReloadEvent::BuildStarting);
    info!(entry = %session.entry().display(), "starting build");
    match session.bundler().build(session.entry()).await {
        Ok(build) => {
            let build = session.install_build(build);
            session.publish(LiveReloadEvent::BuildNew {
                data: build.report.clone(),
            });
            BuildRun::Completed
        }
        Err(e) => {
            error!(error = %e, "build failed");
            BuildRun::Failed
        }
    }
}

pub fn spawn_build(session: Arc<Session>) -> JoinHandle<BuildRun> {
    tokio::spawn(async move { try_start_build(&session).await })
}

/// Build once now, then once per batch of changes until the sender closes.
pub async fn run(session: Arc<Session>, mut changes: mpsc::Receiver<Vec<PathBuf>>) {
    spawn_build(session.clone());
    while let Some(paths) = changes.recv().await {
        for path in &paths {
            info!(path = %path.display(), "file changed");
        }
        spawn_build(session.clone());
    }
    debug!("change feed closed, scheduler stopping");
}
