//! Rebuild orchestration.
//!
//! Coordinates the full build flow: fetch every envelope record, group
//! them into per-programme catalogs, persist all four snapshots. Every
//! rebuild is a full rebuild; there is no incremental path. Failures
//! while fetching abort the build with no snapshot touched, and a
//! failure persisting one programme does not block the others.
//!
//! The [`RebuildScheduler`] coalesces triggers that arrive while a
//! rebuild is already running: at most one follow-up pass is queued, and
//! the pass that ultimately completes reflects the store state at its
//! own start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::catalog::build_catalogs;
use crate::models::Programme;
use crate::snapshot::SnapshotStore;
use crate::source::EnvelopeSource;

/// Outcome of one completed rebuild pass.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    /// Total envelope records observed at the start of the pass.
    pub envelopes: usize,
    /// Publication counts per programme code, in display order.
    pub programmes: Vec<ProgrammeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgrammeCount {
    pub programme: &'static str,
    pub publications: usize,
}

/// Run one full rebuild: fetch, group, persist.
///
/// All four snapshots are written from the same envelope listing. If
/// persisting one programme fails, the remaining programmes are still
/// attempted before the error is reported.
pub async fn run_rebuild(
    source: &dyn EnvelopeSource,
    snapshots: &dyn SnapshotStore,
) -> Result<RebuildSummary> {
    let envelopes = source.list_envelopes(None).await?;
    let catalogs = build_catalogs(&envelopes);

    let mut counts = Vec::with_capacity(Programme::ALL.len());
    let mut write_errors: Vec<String> = Vec::new();

    for catalog in &catalogs {
        let publications: usize = catalog
            .subjects
            .iter()
            .flat_map(|s| &s.groups)
            .map(|g| g.publications.len())
            .sum();

        if let Err(err) = snapshots.write(catalog).await {
            write_errors.push(format!("{}: {err:#}", catalog.programme.code()));
        } else {
            counts.push(ProgrammeCount {
                programme: catalog.programme.code(),
                publications,
            });
        }
    }

    if !write_errors.is_empty() {
        bail!("failed to persist snapshots: {}", write_errors.join("; "));
    }

    Ok(RebuildSummary {
        envelopes: envelopes.len(),
        programmes: counts,
    })
}

/// What happened to a single trigger.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// This trigger ran one or more rebuild passes to completion.
    Completed(RebuildSummary),
    /// A rebuild was already running; this trigger was folded into the
    /// follow-up pass the running task will perform.
    Coalesced,
}

/// Coalesces rebuild triggers (manual or event-driven) into full passes.
///
/// Reads are never blocked: the scheduler serializes builders only, and
/// snapshot replacement itself is atomic per programme.
pub struct RebuildScheduler {
    source: Arc<dyn EnvelopeSource>,
    snapshots: Arc<dyn SnapshotStore>,
    running: tokio::sync::Mutex<()>,
    pending: AtomicBool,
}

impl RebuildScheduler {
    pub fn new(source: Arc<dyn EnvelopeSource>, snapshots: Arc<dyn SnapshotStore>) -> RebuildScheduler {
        RebuildScheduler {
            source,
            snapshots,
            running: tokio::sync::Mutex::new(()),
            pending: AtomicBool::new(false),
        }
    }

    /// Request a rebuild.
    ///
    /// If no rebuild is running, this performs one immediately and keeps
    /// going while further triggers arrived during the pass. If one is
    /// running, the request is recorded and absorbed by that task.
    pub async fn trigger(&self) -> Result<TriggerOutcome> {
        self.pending.store(true, Ordering::SeqCst);

        let mut last = None;
        loop {
            let guard = match self.running.try_lock() {
                Ok(guard) => guard,
                // Another task holds the lock; it will observe the flag
                // and absorb this trigger into its next pass.
                Err(_) => break,
            };

            // Clearing the flag before fetching means a trigger that
            // lands mid-pass schedules exactly one more pass.
            while self.pending.swap(false, Ordering::SeqCst) {
                last = Some(run_rebuild(self.source.as_ref(), self.snapshots.as_ref()).await?);
            }
            drop(guard);

            // A trigger may have set the flag after the final swap but
            // before the unlock, with its own try_lock already failed.
            // Re-check so that trigger is not stranded.
            if !self.pending.load(Ordering::SeqCst) {
                break;
            }
        }

        match last {
            Some(summary) => Ok(TriggerOutcome::Completed(summary)),
            None => Ok(TriggerOutcome::Coalesced),
        }
    }
}
