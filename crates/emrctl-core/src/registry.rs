//! Persisted mapping from provisioning run to its [`ResourceBundle`].
//!
//! Teardown only receives a cluster id from the user. The registry lets it
//! find the exact bucket, roles and security groups that run created instead
//! of re-deriving them from the cluster name.
//!
//! ## Backends
//!
//! - [`FileRegistry`]: one JSON document on local disk, replaced atomically
//!   on every write.
//! - [`MemoryRegistry`]: in-process map for tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::ResourceBundle;
use crate::error::{Error, Result};
use crate::id::RunId;

/// Keyed store of resource bundles.
#[async_trait]
pub trait BundleRegistry: Send + Sync {
    /// Inserts or replaces the record for `bundle.run_id`.
    async fn save(&self, bundle: &ResourceBundle) -> Result<()>;

    /// Reads one record.
    async fn get(&self, run_id: RunId) -> Result<Option<ResourceBundle>>;

    /// Finds the record whose cluster id matches.
    async fn find_by_cluster(&self, cluster_id: &str) -> Result<Option<ResourceBundle>>;

    /// Deletes one record. Succeeds if the record does not exist.
    async fn remove(&self, run_id: RunId) -> Result<()>;

    /// Returns every record, oldest run first.
    async fn list(&self) -> Result<Vec<ResourceBundle>>;
}

/// In-memory registry for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    bundles: Arc<RwLock<HashMap<RunId, ResourceBundle>>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

#[async_trait]
impl BundleRegistry for MemoryRegistry {
    async fn save(&self, bundle: &ResourceBundle) -> Result<()> {
        let mut bundles = self.bundles.write().map_err(|_| poisoned())?;
        bundles.insert(bundle.run_id, bundle.clone());
        Ok(())
    }

    async fn get(&self, run_id: RunId) -> Result<Option<ResourceBundle>> {
        let bundles = self.bundles.read().map_err(|_| poisoned())?;
        Ok(bundles.get(&run_id).cloned())
    }

    async fn find_by_cluster(&self, cluster_id: &str) -> Result<Option<ResourceBundle>> {
        let bundles = self.bundles.read().map_err(|_| poisoned())?;
        Ok(bundles
            .values()
            .find(|b| b.cluster_id.as_deref() == Some(cluster_id))
            .cloned())
    }

    async fn remove(&self, run_id: RunId) -> Result<()> {
        let mut bundles = self.bundles.write().map_err(|_| poisoned())?;
        bundles.remove(&run_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResourceBundle>> {
        let bundles = self.bundles.read().map_err(|_| poisoned())?;
        let mut all: Vec<_> = bundles.values().cloned().collect();
        all.sort_by_key(|b| b.run_id);
        Ok(all)
    }
}

const REGISTRY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    version: u32,
    runs: BTreeMap<RunId, ResourceBundle>,
}

/// Registry stored as a single JSON file.
///
/// Each write serializes the whole document to a sibling temp file and
/// renames it over the original.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    /// Creates a registry backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RegistryDocument> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RegistryDocument {
                    version: REGISTRY_FORMAT_VERSION,
                    runs: BTreeMap::new(),
                });
            }
            Err(e) => {
                return Err(Error::registry_with_source(
                    format!("failed to read {}", self.path.display()),
                    e,
                ));
            }
        };

        let doc: RegistryDocument = serde_json::from_slice(&raw).map_err(|e| {
            Error::registry_with_source(format!("failed to parse {}", self.path.display()), e)
        })?;
        if doc.version != REGISTRY_FORMAT_VERSION {
            return Err(Error::registry(format!(
                "unsupported registry version {} in {}",
                doc.version,
                self.path.display()
            )));
        }
        Ok(doc)
    }

    async fn store(&self, doc: &RegistryDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::registry_with_source(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| Error::registry_with_source("failed to serialize registry", e))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(|e| {
            Error::registry_with_source(format!("failed to write {}", tmp.display()), e)
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::registry_with_source(format!("failed to replace {}", self.path.display()), e)
        })
    }
}

#[async_trait]
impl BundleRegistry for FileRegistry {
    async fn save(&self, bundle: &ResourceBundle) -> Result<()> {
        let mut doc = self.load().await?;
        doc.runs.insert(bundle.run_id, bundle.clone());
        self.store(&doc).await
    }

    async fn get(&self, run_id: RunId) -> Result<Option<ResourceBundle>> {
        Ok(self.load().await?.runs.remove(&run_id))
    }

    async fn find_by_cluster(&self, cluster_id: &str) -> Result<Option<ResourceBundle>> {
        Ok(self
            .load()
            .await?
            .runs
            .into_values()
            .find(|b| b.cluster_id.as_deref() == Some(cluster_id)))
    }

    async fn remove(&self, run_id: RunId) -> Result<()> {
        let mut doc = self.load().await?;
        if doc.runs.remove(&run_id).is_some() {
            self.store(&doc).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResourceBundle>> {
        Ok(self.load().await?.runs.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleStatus;
    use crate::naming::RunPrefix;

    fn bundle(prefix: &str, cluster: Option<&str>) -> ResourceBundle {
        let mut b = ResourceBundle::new(RunPrefix::derive(prefix).expect("valid"));
        b.cluster_id = cluster.map(str::to_string);
        b
    }

    async fn exercise(registry: &dyn BundleRegistry) {
        let first = bundle("alpha", Some("j-AAA"));
        let second = bundle("beta", None);
        registry.save(&first).await.expect("save");
        registry.save(&second).await.expect("save");

        let found = registry.find_by_cluster("j-AAA").await.expect("find");
        assert_eq!(found.as_ref().map(|b| b.run_id), Some(first.run_id));
        assert!(registry.find_by_cluster("j-ZZZ").await.expect("find").is_none());

        let mut updated = first.clone();
        updated.set_status(BundleStatus::Terminated);
        registry.save(&updated).await.expect("update");
        let fetched = registry.get(first.run_id).await.expect("get").expect("exists");
        assert_eq!(fetched.status, BundleStatus::Terminated);

        let all = registry.list().await.expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].run_id, first.run_id);

        registry.remove(first.run_id).await.expect("remove");
        registry.remove(first.run_id).await.expect("remove is idempotent");
        assert!(registry.get(first.run_id).await.expect("get").is_none());
        assert_eq!(registry.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn memory_registry_contract() {
        exercise(&MemoryRegistry::new()).await;
    }

    #[tokio::test]
    async fn file_registry_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileRegistry::new(dir.path().join("nested").join("registry.json"));
        exercise(&registry).await;
        assert!(registry.path().exists());
    }

    async fn assert_lists_in_save_order(registry: &dyn BundleRegistry) {
        let mut saved = Vec::new();
        for _ in 0..50 {
            let record = bundle("burst", None);
            registry.save(&record).await.expect("save");
            saved.push(record.run_id);
        }
        let listed: Vec<RunId> = registry
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|b| b.run_id)
            .collect();
        assert_eq!(listed, saved);
    }

    #[tokio::test]
    async fn memory_registry_lists_burst_oldest_first() {
        assert_lists_in_save_order(&MemoryRegistry::new()).await;
    }

    #[tokio::test]
    async fn file_registry_lists_burst_oldest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_lists_in_save_order(&FileRegistry::new(dir.path().join("registry.json"))).await;
    }

    #[tokio::test]
    async fn file_registry_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.json");
        let record = bundle("gamma", Some("j-GGG"));
        FileRegistry::new(&path).save(&record).await.expect("save");

        let reopened = FileRegistry::new(&path);
        let found = reopened.find_by_cluster("j-GGG").await.expect("find");
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn file_registry_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = FileRegistry::new(dir.path().join("absent.json"));
        assert!(registry.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn file_registry_rejects_corrupt_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.json");
        std::fs::write(&path, b"{not json").expect("write");
        let err = FileRegistry::new(&path).list().await.expect_err("corrupt");
        assert!(matches!(err, Error::Registry { .. }));
    }
}
