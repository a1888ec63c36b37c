//! In-process bucket used by tests and dry runs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::store::{ObjectStore, PublicUrls, StoreEntry};
use crate::sync_error::{SyncError, SyncResult};

#[derive(Default)]
struct Faults {
    failing_folders: HashSet<String>,
    fail_uploads: bool,
    fail_removes: bool,
    stalled_listings: usize,
}

/// Object store kept in a sorted map, with failure injection.
///
/// Folders exist implicitly as prefixes of stored keys, like in a real bucket.
pub struct MemoryStore {
    bucket: String,
    urls: PublicUrls,
    objects: Mutex<BTreeMap<String, Bytes>>,
    faults: Mutex<Faults>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        MemoryStore {
            bucket: config.bucket.clone(),
            urls: PublicUrls::new(config),
            objects: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(Faults::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Seeds objects without counting as store calls.
    pub async fn with_objects<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut objects = self.objects.lock().await;
            for path in paths {
                objects.insert(path.into(), Bytes::from_static(b"\xff\xd8\xff"));
            }
        }
        self
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.lock().await.contains_key(path)
    }

    pub async fn paths(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    pub async fn fail_listing(&self, folder: &str) {
        self.faults.lock().await.failing_folders.insert(folder.to_string());
    }

    pub async fn fail_uploads(&self, fail: bool) {
        self.faults.lock().await.fail_uploads = fail;
    }

    pub async fn fail_removes(&self, fail: bool) {
        self.faults.lock().await.fail_removes = fail;
    }

    /// The next `count` listings come back empty, as if writes were not yet visible.
    pub async fn stall_listings(&self, count: usize) {
        self.faults.lock().await.stalled_listings = count;
    }

    /// Number of store operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> SyncResult<Vec<String>> {
        self.record_call();
        Ok(vec![self.bucket.clone()])
    }

    async fn list(&self, folder: &str) -> SyncResult<Vec<StoreEntry>> {
        self.record_call();
        let folder = folder.trim_end_matches('/');
        {
            let mut faults = self.faults.lock().await;
            if faults.failing_folders.contains(folder) {
                return Err(SyncError::Store(format!("listing '{}' refused", folder)));
            }
            if faults.stalled_listings > 0 {
                faults.stalled_listings -= 1;
                return Ok(Vec::new());
            }
        }

        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder)
        };

        let objects = self.objects.lock().await;
        let mut folders = BTreeSet::new();
        let mut files = Vec::new();
        for key in objects.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((child, _)) => {
                    folders.insert(child.to_string());
                }
                None => files.push(StoreEntry::file(rest)),
            }
        }

        let mut entries: Vec<StoreEntry> = folders.into_iter().map(StoreEntry::folder).collect();
        entries.extend(files);
        Ok(entries)
    }

    async fn upload(&self, path: &str, blob: Bytes, _content_type: &str) -> SyncResult<()> {
        self.record_call();
        if self.faults.lock().await.fail_uploads {
            return Err(SyncError::Store(format!("upload of '{}' refused", path)));
        }
        self.objects.lock().await.insert(path.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> SyncResult<Vec<String>> {
        self.record_call();
        if self.faults.lock().await.fail_removes {
            return Err(SyncError::Store("remove refused".to_string()));
        }
        let mut objects = self.objects.lock().await;
        let removed = paths
            .iter()
            .filter(|path| objects.remove(path.as_str()).is_some())
            .cloned()
            .collect();
        Ok(removed)
    }

    fn public_urls(&self) -> &PublicUrls {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_folders_before_files() {
        let store = MemoryStore::new(&StoreConfig::default())
            .with_objects(vec!["Luna/luna1.jpg", "Luna/luna2.jpg", "tom1.jpg", "Tom/a/b.jpg"])
            .await;

        let root = store.list("").await.unwrap();
        assert_eq!(
            root,
            vec![StoreEntry::folder("Luna"), StoreEntry::folder("Tom"), StoreEntry::file("tom1.jpg")]
        );

        let luna = store.list("Luna").await.unwrap();
        assert_eq!(luna, vec![StoreEntry::file("luna1.jpg"), StoreEntry::file("luna2.jpg")]);
        assert!(store.list("Nobody").await.unwrap().is_empty());
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn remove_reports_only_existing_paths() {
        let store = MemoryStore::new(&StoreConfig::default())
            .with_objects(vec!["Luna/luna1.jpg"])
            .await;

        let removed = store
            .remove(&["Luna/luna1.jpg".to_string(), "Luna/luna9.jpg".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["Luna/luna1.jpg".to_string()]);
        assert!(!store.contains("Luna/luna1.jpg").await);
    }

    #[tokio::test]
    async fn injected_faults_surface_as_store_errors() {
        let store = MemoryStore::new(&StoreConfig::default());
        store.fail_listing("").await;
        assert!(matches!(store.list("").await, Err(SyncError::Store(_))));

        store.stall_listings(1).await;
        store.fail_uploads(true).await;
        assert!(store.upload("a.jpg", Bytes::new(), "image/jpeg").await.is_err());
    }
}
