// src/checkpoint.rs
//! Per-page checkpoints for resumable harvesting
//!
//! A checkpoint holds the verbatim listing payload of one page. Its presence
//! means the page was fully processed, so a later run skips it without
//! fetching it again.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;

/// Mapping from page number to "done" plus the captured payload
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Whether `page` has already been processed
    async fn is_done(&self, page: u32) -> Result<bool>;

    /// The payload captured for `page`, if any
    async fn load(&self, page: u32) -> Result<Option<String>>;

    /// Mark `page` as done, keeping `payload` for audit or replay
    async fn record(&mut self, page: u32, payload: &str) -> Result<()>;

    /// All completed pages, ascending
    async fn completed_pages(&self) -> Result<Vec<u32>>;
}

/// Checkpoints stored as `{namespace}_page_{n}.json` files in one directory
pub struct FileCheckpointStore {
    dir: PathBuf,
    namespace: String,
}

impl FileCheckpointStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub async fn new(dir: PathBuf, namespace: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        let namespace = namespace.into();

        info!("Using checkpoint directory {:?} (namespace {})", dir, namespace);

        Ok(Self { dir, namespace })
    }

    /// Path of the checkpoint file for `page`
    pub fn page_path(&self, page: u32) -> PathBuf {
        self.dir.join(format!("{}_page_{}.json", self.namespace, page))
    }

    fn page_from_file_name(&self, file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(&self.namespace)?
            .strip_prefix("_page_")?
            .strip_suffix(".json")?
            .parse()
            .ok()
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn is_done(&self, page: u32) -> Result<bool> {
        Ok(fs::try_exists(self.page_path(page)).await?)
    }

    async fn load(&self, page: u32) -> Result<Option<String>> {
        let path = self.page_path(page);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    async fn record(&mut self, page: u32, payload: &str) -> Result<()> {
        let path = self.page_path(page);

        // Write to temporary file first, then rename, so an interrupted run
        // never leaves a half-written checkpoint that looks complete
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, payload).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("Checkpoint for page {} saved to {:?}", page, path);
        Ok(())
    }

    async fn completed_pages(&self) -> Result<Vec<u32>> {
        let mut pages = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if let Some(page) = entry
                .file_name()
                .to_str()
                .and_then(|name| self.page_from_file_name(name))
            {
                pages.push(page);
            }
        }

        pages.sort_unstable();
        Ok(pages)
    }
}

/// In-memory checkpoint store. Clones share the same pages.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    pages: Arc<Mutex<BTreeMap<u32, String>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate pages, as if an earlier run had completed them
    pub fn with_pages<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = (u32, String)>,
    {
        Self {
            pages: Arc::new(Mutex::new(pages.into_iter().collect())),
        }
    }

    fn pages(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, String>> {
        match self.pages.lock() {
            Ok(pages) => pages,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn is_done(&self, page: u32) -> Result<bool> {
        Ok(self.pages().contains_key(&page))
    }

    async fn load(&self, page: u32) -> Result<Option<String>> {
        Ok(self.pages().get(&page).cloned())
    }

    async fn record(&mut self, page: u32, payload: &str) -> Result<()> {
        self.pages().insert(page, payload.to_string());
        Ok(())
    }

    async fn completed_pages(&self) -> Result<Vec<u32>> {
        Ok(self.pages().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut store = FileCheckpointStore::new(temp.path().join("cp"), "bugcrowd")
            .await
            .unwrap();

        // Initially nothing is done
        assert!(!store.is_done(1).await.unwrap());
        assert_eq!(store.load(1).await.unwrap(), None);

        store.record(1, r#"{"engagements":[]}"#).await.unwrap();
        store.record(3, "{}").await.unwrap();

        assert!(store.is_done(1).await.unwrap());
        assert!(!store.is_done(2).await.unwrap());
        assert_eq!(
            store.load(1).await.unwrap().as_deref(),
            Some(r#"{"engagements":[]}"#)
        );
        assert_eq!(store.completed_pages().await.unwrap(), vec![1, 3]);
        assert!(temp.path().join("cp/bugcrowd_page_1.json").exists());
        assert!(!temp.path().join("cp/bugcrowd_page_1.tmp").exists());
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let mut desc = FileCheckpointStore::new(temp.path().to_path_buf(), "hackerone_launched_at_desc")
            .await
            .unwrap();
        let asc = FileCheckpointStore::new(temp.path().to_path_buf(), "hackerone_launched_at_asc")
            .await
            .unwrap();

        desc.record(1, "{}").await.unwrap();

        assert!(desc.is_done(1).await.unwrap());
        assert!(!asc.is_done(1).await.unwrap());
        assert!(asc.completed_pages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopened_store_sees_previous_run() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = FileCheckpointStore::new(temp.path().to_path_buf(), "bugcrowd")
                .await
                .unwrap();
            store.record(1, "page one").await.unwrap();
            store.record(2, "page two").await.unwrap();
        }

        let store = FileCheckpointStore::new(temp.path().to_path_buf(), "bugcrowd")
            .await
            .unwrap();
        assert_eq!(store.completed_pages().await.unwrap(), vec![1, 2]);
        assert_eq!(store.load(2).await.unwrap().as_deref(), Some("page two"));
    }

    #[tokio::test]
    async fn test_memory_store_clone_shares_pages() {
        let store = MemoryCheckpointStore::with_pages([(1, "one".to_string())]);
        let mut clone = store.clone();

        clone.record(2, "two").await.unwrap();

        assert!(store.is_done(1).await.unwrap());
        assert!(store.is_done(2).await.unwrap());
        assert_eq!(store.completed_pages().await.unwrap(), vec![1, 2]);
    }
}
