//! Entry points used by the presentation layer.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::PhotoConfig;
use crate::deleter::{DeleteOutcome, PhotoDeleter};
use crate::locator::PhotoLocator;
use crate::model::payload::PhotoPayload;
use crate::model::photo_album::PhotoSet;
use crate::reconcile::Reconciler;
use crate::store::ObjectStore;
use crate::sync_error::SyncResult;
use crate::uploader::{PayloadFetcher, PhotoUploader, UploadReport};

/// Result of checking that the photo bucket is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub bucket: String,
    pub bucket_found: bool,
    pub root_entries: Option<usize>,
    pub error: Option<String>,
}

impl StorageStatus {
    pub fn is_ready(&self) -> bool {
        self.bucket_found && self.root_entries.is_some()
    }
}

/// Lists buckets, looks for the configured one and lists its root.
pub async fn verify_storage(store: &dyn ObjectStore, bucket: &str) -> StorageStatus {
    let mut status = StorageStatus {
        bucket: bucket.to_string(),
        bucket_found: false,
        root_entries: None,
        error: None,
    };

    match store.list_buckets().await {
        Ok(buckets) => status.bucket_found = buckets.iter().any(|b| b == bucket),
        Err(err) => {
            tracing::warn!(error = %err, "cannot list buckets");
            status.error = Some(err.to_string());
            return status;
        }
    }
    if !status.bucket_found {
        tracing::warn!(bucket, "photo bucket not found");
        return status;
    }

    match store.list("").await {
        Ok(entries) => status.root_entries = Some(entries.len()),
        Err(err) => {
            tracing::warn!(error = %err, "cannot list bucket root");
            status.error = Some(err.to_string());
        }
    }
    status
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub outcome: DeleteOutcome,
    /// Photo set re-read after the delete; `None` when reconciliation was skipped.
    pub photos: Option<PhotoSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub report: UploadReport,
    pub photos: Option<PhotoSet>,
}

/// Photo operations for one bucket, wired from a [`PhotoConfig`].
pub struct PhotoService {
    status: StorageStatus,
    locator: Arc<PhotoLocator>,
    uploader: PhotoUploader,
    deleter: PhotoDeleter,
    reconciler: Arc<Reconciler>,
}

impl PhotoService {
    /// Verifies the bucket once and keeps the result for the service's lifetime.
    pub async fn connect(
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn PayloadFetcher>,
        config: &PhotoConfig,
    ) -> PhotoService {
        let status = verify_storage(store.as_ref(), &config.store.bucket).await;
        Self::new(store, fetcher, config, status)
    }

    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn PayloadFetcher>,
        config: &PhotoConfig,
        status: StorageStatus,
    ) -> PhotoService {
        let locator = Arc::new(PhotoLocator::new(store.clone(), config.locator.clone()));
        PhotoService {
            status,
            uploader: PhotoUploader::new(store.clone(), fetcher),
            deleter: PhotoDeleter::new(store).protect(config.locator.placeholder_path.clone()),
            reconciler: Arc::new(Reconciler::new(locator.clone(), config.reconcile)),
            locator,
        }
    }

    pub fn status(&self) -> &StorageStatus {
        &self.status
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub async fn resolve_main_photo(&self, name: &str) -> Option<String> {
        self.locator.main_photo(name).await.map(|p| p.into_url())
    }

    pub async fn resolve_all_photos(&self, name: &str) -> Vec<String> {
        self.locator
            .all_photos(name)
            .await
            .into_iter()
            .map(|p| p.into_url())
            .collect()
    }

    /// Photo URLs for each entity of a record listing, one entity at a time.
    pub async fn resolve_catalog(&self, names: &[String]) -> Vec<(String, Vec<String>)> {
        stream::iter(names)
            .then(|name| async move { (name.clone(), self.resolve_all_photos(name).await) })
            .collect()
            .await
    }

    pub async fn upload_photos(&self, name: &str, payloads: &[PhotoPayload]) -> SyncResult<UploadReport> {
        self.uploader.upload_photos(name, payloads).await
    }

    /// Uploads, then re-reads the entity's photos.
    pub async fn upload_and_reconcile<F>(
        &self,
        name: &str,
        payloads: &[PhotoPayload],
        on_progress: F,
    ) -> SyncResult<UploadResult>
    where
        F: FnMut(usize, usize) + Send,
    {
        let report = self.uploader.upload_photos_with_progress(name, payloads, on_progress).await?;
        let photos = self.reconciler.reconcile(name).await;
        Ok(UploadResult { report, photos })
    }

    /// True whenever the photo may be dropped from view, found in the store or not.
    pub async fn delete_photo(&self, url: &str, name: &str) -> SyncResult<bool> {
        let outcome = self.deleter.delete_photo(url, name).await?;
        Ok(outcome.remove_from_view())
    }

    pub async fn delete_and_reconcile(&self, url: &str, name: &str) -> SyncResult<DeleteResult> {
        let outcome = self.deleter.delete_photo(url, name).await?;
        let photos = self.reconciler.reconcile(name).await;
        Ok(DeleteResult { outcome, photos })
    }

    /// First display of an entity's photo manager.
    pub async fn open_manager(&self, name: &str) -> Option<PhotoSet> {
        self.reconciler.reconcile(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::MemoryStore;
    use crate::uploader::HttpFetcher;

    #[tokio::test]
    async fn verify_reports_bucket_and_root() {
        let store = MemoryStore::new(&StoreConfig::default())
            .with_objects(vec!["Luna/luna1.jpg", "tom1.jpg"])
            .await;

        let status = verify_storage(&store, "cat-photos").await;
        assert!(status.is_ready());
        assert_eq!(status.root_entries, Some(2));

        let missing = verify_storage(&store, "dog-photos").await;
        assert!(!missing.bucket_found);
        assert!(!missing.is_ready());
    }

    #[tokio::test]
    async fn verify_records_root_failure() {
        let store = MemoryStore::new(&StoreConfig::default());
        store.fail_listing("").await;

        let status = verify_storage(&store, "cat-photos").await;
        assert!(status.bucket_found);
        assert!(!status.is_ready());
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn catalog_keeps_entity_order() {
        let store = Arc::new(
            MemoryStore::new(&StoreConfig::default())
                .with_objects(vec!["Tom/tom1.jpg", "Luna/luna1.jpg"])
                .await,
        );
        let config = PhotoConfig::default();
        let service = PhotoService::connect(store, Arc::new(HttpFetcher::new()), &config).await;

        let catalog = service
            .resolve_catalog(&["Tom".to_string(), "Luna".to_string(), "Nadie".to_string()])
            .await;
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].0, "Tom");
        assert!(catalog[0].1[0].contains("/Tom/tom1.jpg"));
        assert_eq!(catalog[2].1, vec![config.locator.fallback_url.clone()]);
    }
}
