//! Maps a displayed photo URL back to its object and removes it.
//!
//! Strategies run in order until one removes an object:
//! the path encoded in the URL, the bare filename inside the entity's
//! candidate folders, the bare filename at the root, and finally a scan of
//! every folder. When nothing is removed the handle is still reported as safe
//! to drop from view.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::locator::{list_or_warn, matching_folders};
use crate::names::NameCandidates;
use crate::store::{bare_filename, join_path, ObjectStore};
use crate::sync_error::{SyncError, SyncResult};

/// What a delete strategy gets to work with.
pub struct DeleteTarget<'a> {
    pub url: &'a str,
    pub names: &'a NameCandidates,
    pub filename: Option<String>,
    /// Shared objects no delete may touch, such as the placeholder image.
    pub protected: &'a [String],
}

impl DeleteTarget<'_> {
    fn is_protected(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.protected.iter().any(|p| p.trim_start_matches('/') == path)
    }
}

#[async_trait]
pub trait DeleteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Path of the removed object, or `None` when this strategy removed nothing.
    async fn delete(&self, store: &dyn ObjectStore, target: &DeleteTarget<'_>) -> Option<String>;
}

/// Removes `path`, treating store errors, missing and protected objects as "not removed".
async fn remove_one(
    store: &dyn ObjectStore,
    target: &DeleteTarget<'_>,
    path: &str,
    step: &'static str,
) -> Option<String> {
    if target.is_protected(path) {
        tracing::warn!(step, path, "refusing to remove a shared object");
        return None;
    }
    match store.remove(&[path.to_string()]).await {
        Ok(removed) if !removed.is_empty() => Some(path.to_string()),
        Ok(_) => {
            tracing::debug!(step, path, "no object at path");
            None
        }
        Err(err) => {
            tracing::warn!(step, path, error = %err, "store remove failed");
            None
        }
    }
}

/// The object path encoded after the bucket marker of the public URL.
pub struct UrlPath;

#[async_trait]
impl DeleteStrategy for UrlPath {
    fn name(&self) -> &'static str {
        "url-path"
    }

    async fn delete(&self, store: &dyn ObjectStore, target: &DeleteTarget<'_>) -> Option<String> {
        let path = match store.public_urls().object_path(target.url) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(url = target.url, error = %err, "url does not map to an object path");
                return None;
            }
        };
        remove_one(store, target, path.as_str(), self.name()).await
    }
}

/// The bare filename inside folders matching the entity name.
pub struct CandidateFolders;

#[async_trait]
impl DeleteStrategy for CandidateFolders {
    fn name(&self) -> &'static str {
        "candidate-folders"
    }

    async fn delete(&self, store: &dyn ObjectStore, target: &DeleteTarget<'_>) -> Option<String> {
        let filename = target.filename.as_deref()?;
        let root = list_or_warn(store, "", self.name()).await?;

        for folder in matching_folders(&root, target.names) {
            let entries = match list_or_warn(store, &folder, self.name()).await {
                Some(entries) => entries,
                None => continue,
            };
            if entries.iter().any(|e| !e.is_folder && e.name == filename) {
                if let Some(path) = remove_one(store, target, &join_path(&folder, filename), self.name()).await {
                    return Some(path);
                }
            }
        }
        None
    }
}

/// The bare filename at the bucket root.
pub struct RootFile;

#[async_trait]
impl DeleteStrategy for RootFile {
    fn name(&self) -> &'static str {
        "root-file"
    }

    async fn delete(&self, store: &dyn ObjectStore, target: &DeleteTarget<'_>) -> Option<String> {
        let filename = target.filename.as_deref()?;
        remove_one(store, target, filename, self.name()).await
    }
}

/// Every object of every folder: an exact filename match first, else the
/// first object whose name appears in the URL.
pub struct ExhaustiveScan;

#[async_trait]
impl DeleteStrategy for ExhaustiveScan {
    fn name(&self) -> &'static str {
        "exhaustive-scan"
    }

    async fn delete(&self, store: &dyn ObjectStore, target: &DeleteTarget<'_>) -> Option<String> {
        let root = list_or_warn(store, "", self.name()).await?;

        let mut objects = Vec::new();
        for folder in root.iter().filter(|e| e.is_folder) {
            let entries = match list_or_warn(store, &folder.name, self.name()).await {
                Some(entries) => entries,
                None => continue,
            };
            objects.extend(
                entries
                    .into_iter()
                    .filter(|e| !e.is_folder)
                    .map(|e| (join_path(&folder.name, &e.name), e.name)),
            );
        }

        let exact = target
            .filename
            .as_deref()
            .and_then(|filename| objects.iter().find(|(_, name)| name == filename));
        let candidate = exact.or_else(|| objects.iter().find(|(_, name)| target.url.contains(name.as_str())));

        match candidate {
            Some((path, _)) => remove_one(store, target, path, self.name()).await,
            None => None,
        }
    }
}

pub fn default_strategies() -> Vec<Box<dyn DeleteStrategy>> {
    vec![
        Box::new(UrlPath),
        Box::new(CandidateFolders),
        Box::new(RootFile),
        Box::new(ExhaustiveScan),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Object actually removed from the store, if any.
    pub removed_path: Option<String>,
    pub strategy: Option<&'static str>,
}

impl DeleteOutcome {
    pub fn deleted_from_store(&self) -> bool {
        self.removed_path.is_some()
    }

    /// Always true: a photo that could not be found must not stay on screen.
    pub fn remove_from_view(&self) -> bool {
        true
    }
}

pub struct PhotoDeleter {
    store: Arc<dyn ObjectStore>,
    strategies: Vec<Box<dyn DeleteStrategy>>,
    protected: Vec<String>,
}

impl PhotoDeleter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_strategies(store, default_strategies())
    }

    pub fn with_strategies(store: Arc<dyn ObjectStore>, strategies: Vec<Box<dyn DeleteStrategy>>) -> Self {
        PhotoDeleter { store, strategies, protected: Vec::new() }
    }

    /// Keeps `path` out of reach of every strategy; deleting it only drops it from view.
    pub fn protect(mut self, path: impl Into<String>) -> Self {
        self.protected.push(path.into());
        self
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_photo(&self, url: &str, name: &str) -> SyncResult<DeleteOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SyncError::MissingPhotoUrl);
        }
        let names = NameCandidates::resolve(name).ok_or(SyncError::MissingIdentity("delete"))?;

        let target = DeleteTarget {
            url,
            names: &names,
            filename: bare_filename(url),
            protected: &self.protected,
        };
        for strategy in &self.strategies {
            if let Some(path) = strategy.delete(self.store.as_ref(), &target).await {
                tracing::info!(strategy = strategy.name(), path = %path, "deleted photo");
                return Ok(DeleteOutcome { removed_path: Some(path), strategy: Some(strategy.name()) });
            }
            tracing::debug!(strategy = strategy.name(), "delete strategy found nothing");
        }

        tracing::warn!(url, "photo not found in store, dropping it from view only");
        Ok(DeleteOutcome { removed_path: None, strategy: None })
    }
}
