//! Catalog snapshot persistence.
//!
//! One snapshot per known programme, addressed by its lowercase code.
//! The [`SnapshotStore`] trait guarantees atomic per-programme
//! replacement: a concurrent reader observes either the complete prior
//! snapshot or the complete new one, never a mixture. Writes for
//! different programmes are independent; one failure must not corrupt
//! or block the others.

pub mod fs;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Catalog, Programme};

/// Versioned, replace-whole-value storage for catalog snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Atomically replace the snapshot for the catalog's programme.
    async fn write(&self, catalog: &Catalog) -> Result<()>;

    /// Read the current snapshot for a programme.
    ///
    /// Returns `Ok(None)` only if the builder has never written this
    /// programme; after a first successful build, all four snapshots
    /// exist (possibly with an empty subject list).
    async fn read(&self, programme: Programme) -> Result<Option<Arc<Catalog>>>;
}
