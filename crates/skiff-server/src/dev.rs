//! Serialized rebuild loop.

use skiff_static::{BuildReport, Builder, ChangeSet};
use tokio::sync::mpsc;

use crate::websocket::{ReloadHub, ReloadMessage};

/// Owns the builder and runs one pass at a time.
///
/// Batches that arrive while a pass is running are merged and handled by the
/// next pass.
pub struct DevLoop {
    builder: Builder,
    hub: ReloadHub,
}

impl DevLoop {
    pub fn new(builder: Builder, hub: ReloadHub) -> Self {
        Self { builder, hub }
    }

    /// Run a single pass and notify browsers of the outcome.
    pub async fn pass(&mut self, changes: &ChangeSet) -> Option<BuildReport> {
        match self.builder.build(changes).await {
            Ok(report) => {
                self.hub.send(ReloadMessage::Reload);
                Some(report)
            }
            Err(e) => {
                tracing::error!("Build failed: {}", e);
                self.hub.send(ReloadMessage::BuildFailed {
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Consume change sets until the channel closes, then remove the staging
    /// directory.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ChangeSet>) {
        while let Some(mut changes) = rx.recv().await {
            while let Ok(more) = rx.try_recv() {
                changes.merge(more);
            }
            if changes.is_empty() {
                continue;
            }
            self.pass(&changes).await;
        }

        if let Err(e) = self.builder.finish() {
            tracing::warn!("Failed to clean up: {}", e);
        }
    }
}
