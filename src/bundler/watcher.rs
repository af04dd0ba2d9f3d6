//! File watching for sources and build output.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::bundler::BundlerError;

/// Watch `paths`, forwarding every created or modified path that passes
/// `filter` into `tx`.
///
/// The returned watcher must be kept alive for events to keep flowing.
pub fn watch<F>(
    paths: &[PathBuf],
    recursive: bool,
    tx: mpsc::UnboundedSender<PathBuf>,
    filter: F,
) -> Result<RecommendedWatcher, BundlerError>
where
    F: Fn(&Path) -> bool + Send + 'static,
{
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.kind.is_modify() || event.kind.is_create() {
                    for path in event.paths {
                        if filter(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )
    .map_err(|source| BundlerError::Watch {
        path: paths.first().cloned().unwrap_or_default(),
        source,
    })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    for path in paths {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        watcher.watch(&path, mode).map_err(|source| BundlerError::Watch {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), recursive, "Watching path");
    }

    Ok(watcher)
}

/// Wait for a change, then collect further changes until `quiet` passes
/// without any.
///
/// Returns `None` once the sending side is gone.
pub async fn debounced(rx: &mut mpsc::UnboundedReceiver<PathBuf>, quiet: Duration) -> Option<BTreeSet<PathBuf>> {
    let first = rx.recv().await?;
    let mut batch = BTreeSet::from([first]);

    loop {
        match tokio::time::timeout(quiet, rx.recv()).await {
            Ok(Some(path)) => {
                batch.insert(path);
            }
            Ok(None) | Err(_) => return Some(batch),
        }
    }
}

/// Regular files directly inside `dir`, sorted by name.
pub fn existing_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list output directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}
