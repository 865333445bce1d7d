//! In-memory [`SnapshotStore`] for tests and embedded use.
//!
//! Snapshots are immutable `Arc<Catalog>` values swapped under a
//! `std::sync::RwLock`; readers holding an `Arc` keep a complete,
//! self-consistent snapshot even while a rebuild replaces the entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Catalog, Programme};

use super::SnapshotStore;

#[derive(Default)]
pub struct MemorySnapshotStore {
    catalogs: RwLock<HashMap<Programme, Arc<Catalog>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> MemorySnapshotStore {
        MemorySnapshotStore::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn write(&self, catalog: &Catalog) -> Result<()> {
        let mut catalogs = self.catalogs.write().unwrap();
        catalogs.insert(catalog.programme, Arc::new(catalog.clone()));
        Ok(())
    }

    async fn read(&self, programme: Programme) -> Result<Option<Arc<Catalog>>> {
        let catalogs = self.catalogs.read().unwrap();
        Ok(catalogs.get(&programme).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn value_swap_leaves_prior_readers_intact() {
        let store = MemorySnapshotStore::new();
        store.write(&Catalog::empty(Programme::Dp)).await.unwrap();

        let held = store.read(Programme::Dp).await.unwrap().unwrap();

        let mut replacement = Catalog::empty(Programme::Dp);
        replacement.subjects.push(crate::models::SubjectSection {
            subject: "sciences".to_string(),
            groups: Vec::new(),
        });
        store.write(&replacement).await.unwrap();

        // The earlier reader still sees the old complete snapshot.
        assert!(held.subjects.is_empty());
        let fresh = store.read(Programme::Dp).await.unwrap().unwrap();
        assert_eq!(fresh.subjects.len(), 1);
    }
}
