//! File watching for the dev loop.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{event::ModifyKind, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use skiff_static::{BuildConfig, Change, ChangeKind, ChangeSet};
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// Events closer together than this end up in the same change set.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Recursive watcher over a project root, emitting batched change sets.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root`, skipping everything under `ignore`.
    ///
    /// Returns the watcher and a channel of change sets. Dropping the
    /// watcher closes the channel.
    pub fn new(
        root: &Path,
        ignore: Vec<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<ChangeSet>), ServerError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut batch = ChangeSet::default();
                collect(&mut batch, first, &ignore);

                while let Ok(event) = sync_rx.recv_timeout(QUIET_PERIOD) {
                    collect(&mut batch, event, &ignore);
                }

                if batch.is_empty() {
                    continue;
                }
                tracing::debug!("{} changed path(s)", batch.changes.len());
                if async_tx.blocking_send(batch).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }

    /// Watch a project `root`, skipping the output and staging directories
    /// the builder writes to.
    pub fn for_site(
        root: &Path,
        config: &BuildConfig,
    ) -> Result<(Self, async_mpsc::Receiver<ChangeSet>), ServerError> {
        let root =
            std::path::absolute(root).map_err(|e| ServerError::WatchError(e.to_string()))?;
        tracing::debug!("Watching {}", root.display());

        Self::new(
            &root,
            vec![config.output_dir.clone(), config.staging_dir.clone()],
        )
    }
}

fn collect(batch: &mut ChangeSet, event: notify::Event, ignore: &[PathBuf]) {
    let changes = event
        .paths
        .iter()
        .filter(|path| !ignore.iter().any(|dir| path.starts_with(dir)))
        .filter_map(|path| {
            classify_event(path, &event.kind).map(|kind| Change::new(kind, path.clone()))
        })
        .collect();

    batch.merge(ChangeSet::new(changes));
}

/// Map a notify event on `path` to a change kind.
fn classify_event(path: &Path, kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        // Renames report both ends; whichever still exists was added
        EventKind::Modify(ModifyKind::Name(_)) => {
            if path.exists() {
                Some(ChangeKind::Added)
            } else {
                Some(ChangeKind::Removed)
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}
