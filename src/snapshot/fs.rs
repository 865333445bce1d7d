//! Filesystem-backed [`SnapshotStore`].
//!
//! Each programme's catalog is one JSON file at `<dir>/<key>.json`
//! (`pyp.json`, `myp.json`, `dp.json`, `cp.json`). Replacement writes
//! the new content to a temporary file in the same directory and then
//! renames it over the old one, so readers see a complete snapshot on
//! every read.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{Catalog, Programme};

use super::SnapshotStore;

pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<FsSnapshotStore> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
        Ok(FsSnapshotStore { dir })
    }

    fn path_for(&self, programme: Programme) -> PathBuf {
        self.dir.join(format!("{}.json", programme.key()))
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn write(&self, catalog: &Catalog) -> Result<()> {
        let path = self.path_for(catalog.programme);
        let tmp = self.dir.join(format!(".{}.json.tmp", catalog.programme.key()));

        let content = serde_json::to_vec_pretty(catalog)
            .with_context(|| format!("failed to serialize {} catalog", catalog.programme.code()))?;

        std::fs::write(&tmp, content)
            .with_context(|| format!("failed to write snapshot {}", tmp.display()))?;

        // Same-directory rename: the old snapshot stays intact until the
        // new one replaces it in a single step.
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace snapshot {}", path.display()))?;

        Ok(())
    }

    async fn read(&self, programme: Programme) -> Result<Option<Arc<Catalog>>> {
        let path = self.path_for(programme);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read snapshot {}", path.display()))
            }
        };

        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("malformed snapshot {}", path.display()))?;

        Ok(Some(Arc::new(catalog)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublicationGroup, SubjectSection};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_catalog() -> Catalog {
        Catalog {
            programme: Programme::Dp,
            subjects: vec![SubjectSection {
                subject: "sciences".to_string(),
                groups: vec![PublicationGroup {
                    translation_group: "chemistry guide".to_string(),
                    publications: vec![crate::models::Envelope {
                        programme: Programme::Dp,
                        subject: "sciences".to_string(),
                        publication: "Chemistry Guide".to_string(),
                        language: "en".to_string(),
                        translation_of: None,
                        last_modified: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
                        uri: "/maps/chem-guide.ditamap".to_string(),
                        envelope_uri: "/envelopes/chem-en.json".to_string(),
                        topics: Vec::new(),
                        attachments: Vec::new(),
                    }],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn missing_snapshot_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(tmp.path()).unwrap();
        assert!(store.read(Programme::Pyp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(tmp.path()).unwrap();

        let catalog = sample_catalog();
        store.write(&catalog).await.unwrap();

        let back = store.read(Programme::Dp).await.unwrap().unwrap();
        assert_eq!(*back, catalog);
    }

    #[tokio::test]
    async fn rewrite_replaces_the_whole_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(tmp.path()).unwrap();

        store.write(&sample_catalog()).await.unwrap();
        store.write(&Catalog::empty(Programme::Dp)).await.unwrap();

        let back = store.read(Programme::Dp).await.unwrap().unwrap();
        assert!(back.subjects.is_empty());
    }

    #[tokio::test]
    async fn programmes_are_independent_files() {
        let tmp = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(tmp.path()).unwrap();

        store.write(&sample_catalog()).await.unwrap();
        assert!(store.read(Programme::Dp).await.unwrap().is_some());
        assert!(store.read(Programme::Myp).await.unwrap().is_none());
        assert!(tmp.path().join("dp.json").exists());
    }
}
