//! Sync loop - periodic enumeration of the local tree
//!
//! The [`SyncLoop`] owns the snapshot of the previous tick. Every tick it
//! walks the local root, diffs the result against the snapshot and hands
//! newly appeared files to a [`NewFilesHandler`].
//!
//! ## Flow
//!
//! ```text
//! list_local_files ──→ newly_seen(current, snapshot) ──→ handler.handle(batch)
//!                                                              │
//!                                                  snapshot = current
//! ```
//!
//! The snapshot is only replaced on ticks that found something new, and
//! only after the handler succeeded. The loop stops when its
//! `CancellationToken` fires, either before a tick or during the sleep
//! between two ticks; a tick in progress runs to completion.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use upsync_core::domain::diff::newly_seen;
use upsync_core::domain::newtypes::{PathSet, RelativePath};

use crate::filesystem::list_local_files;
use crate::orchestrator::{BatchReport, NewFilesHandler};
use crate::SyncError;

/// Default idle time between two ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new on disk; the snapshot was left as is
    Idle,
    /// New files were handed to the handler
    Processed(BatchReport),
}

/// Poll loop over a local root
pub struct SyncLoop<H> {
    handler: H,
    local_root: PathBuf,
    interval: Duration,
    snapshot: PathSet,
}

impl<H: NewFilesHandler> SyncLoop<H> {
    /// Creates a loop with an empty snapshot and the default interval
    pub fn new(handler: H, local_root: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            local_root: local_root.into(),
            interval: DEFAULT_POLL_INTERVAL,
            snapshot: PathSet::new(),
        }
    }

    /// Sets the idle time between two ticks
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The files seen by the last tick that found something new
    pub fn snapshot(&self) -> &PathSet {
        &self.snapshot
    }

    /// The wrapped handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Runs a single enumerate-diff-handle cycle
    pub async fn tick(&mut self) -> Result<TickOutcome, SyncError> {
        let current = list_local_files(&self.local_root).await?;
        let batch = newly_seen(&current, &self.snapshot);

        if batch.is_empty() {
            debug!(files = current.len(), "No new files");
            return Ok(TickOutcome::Idle);
        }

        info!(
            count = batch.len(),
            files = ?batch.iter().map(RelativePath::as_str).collect::<Vec<_>>(),
            "Find new files"
        );

        let report = self.handler.handle(&batch).await?;
        self.snapshot = current;

        Ok(TickOutcome::Processed(report))
    }

    /// Ticks until `shutdown` is cancelled
    ///
    /// Returns `Ok(())` after an interrupt; any tick error ends the loop
    /// and is returned as is.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(
            root = %self.local_root.display(),
            interval_secs = self.interval.as_secs_f64(),
            "Sync loop starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.tick().await?;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Aborted.");
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================
