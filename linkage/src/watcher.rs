//! # Stop File
//!
//! A running training loop is stopped by creating a file named `STOP` in the
//! run's results directory. The watcher runs on the `notify` crate's own
//! thread and only raises the shared [`StopSignal`]; the loop notices it
//! between two steps.

use std::path::Path;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use rl::StopSignal;
use tracing::{error, info};

pub const STOP_FILE: &str = "STOP";

fn is_stop_file(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == STOP_FILE)
}

fn handle_event(result: notify::Result<Event>, stop: &StopSignal) {
    match result {
        Ok(event) => {
            if !event.kind.is_create() && !event.kind.is_modify() {
                return;
            }
            if event.paths.iter().any(|p| is_stop_file(p)) {
                info!("stop file detected, finishing after the current step");
                stop.raise();
            }
        }
        Err(e) => error!("file watcher error: {e:?}"),
    }
}

/// Watch `dir` for a stop file. The directory is created if needed and a
/// stale stop file from an earlier run is removed.
///
/// The caller must keep the returned watcher alive for as long as the run
/// lasts.
///
/// # Errors
///
/// The directory cannot be prepared or the watcher cannot be started.
pub fn watch(dir: &Path, stop: StopSignal) -> Result<RecommendedWatcher> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stale = dir.join(STOP_FILE);
    if stale.exists() {
        std::fs::remove_file(&stale).with_context(|| format!("removing stale {}", stale.display()))?;
    }

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| handle_event(res, &stop))
        .map_err(|e| anyhow::anyhow!("failed to create file watcher: {e}"))?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|e| anyhow::anyhow!("failed to watch {}: {e}", dir.display()))?;
    info!("watching {} for a {STOP_FILE} file", dir.display());
    Ok(watcher)
}
