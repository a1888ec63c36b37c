//! Writes new photos under the next free sequential filenames.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use serde::Serialize;

use crate::locator::matching_folders;
use crate::model::payload::PhotoPayload;
use crate::names::NameCandidates;
use crate::store::{join_path, ObjectStore, JPEG_CONTENT_TYPE};
use crate::sync_error::{SyncError, SyncResult};

/// Source of bytes for remote payloads.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> SyncResult<Bytes>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher { client: reqwest::Client::new() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayloadFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<Bytes> {
        let fetch_err = |e: reqwest::Error| SyncError::Fetch { url: url.to_string(), reason: e.to_string() };

        let res = self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        res.bytes().await.map_err(fetch_err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub index: usize,
    pub path: String,
    pub reason: String,
}

/// Outcome of a batch: `success` only when every payload was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub success: bool,
    pub urls: Vec<String>,
    pub failures: Vec<UploadFailure>,
}

pub struct PhotoUploader {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn PayloadFetcher>,
}

impl PhotoUploader {
    pub fn new(store: Arc<dyn ObjectStore>, fetcher: Arc<dyn PayloadFetcher>) -> Self {
        PhotoUploader { store, fetcher }
    }

    pub async fn upload_photos(&self, name: &str, payloads: &[PhotoPayload]) -> SyncResult<UploadReport> {
        self.upload_photos_with_progress(name, payloads, |_, _| {}).await
    }

    /// Uploads `payloads` in order, calling `on_progress(done, total)` after each one.
    ///
    /// Every payload consumes one sequence number, failed ones included.
    #[tracing::instrument(skip(self, payloads, on_progress), fields(count = payloads.len()))]
    pub async fn upload_photos_with_progress<F>(
        &self,
        name: &str,
        payloads: &[PhotoPayload],
        mut on_progress: F,
    ) -> SyncResult<UploadReport>
    where
        F: FnMut(usize, usize) + Send,
    {
        let names = NameCandidates::resolve(name).ok_or(SyncError::MissingIdentity("upload"))?;
        let folder = self.target_folder(&names).await;

        let start = match self.next_sequence(&folder, &names.base_name).await {
            Ok(seq) => seq,
            Err(err) => {
                tracing::warn!(folder = %folder, error = %err, "cannot number new photos, nothing written");
                let failures = payloads
                    .iter()
                    .enumerate()
                    .map(|(index, _)| UploadFailure {
                        index,
                        path: String::new(),
                        reason: err.to_string(),
                    })
                    .collect::<Vec<_>>();
                return Ok(UploadReport { success: payloads.is_empty(), urls: Vec::new(), failures });
            }
        };

        let mut urls = Vec::new();
        let mut failures = Vec::new();
        for (index, payload) in payloads.iter().enumerate() {
            let seq = match u32::try_from(index).ok().and_then(|i| start.checked_add(i)) {
                Some(seq) => seq,
                None => {
                    tracing::warn!(folder = %folder, index, "photo sequence exhausted");
                    failures.push(UploadFailure {
                        index,
                        path: String::new(),
                        reason: "photo sequence number overflow".to_string(),
                    });
                    on_progress(index + 1, payloads.len());
                    continue;
                }
            };
            let path = join_path(&folder, &names.file_name(seq));

            match self.write_one(&path, payload).await {
                Ok(()) => {
                    tracing::info!(path = %path, "uploaded photo");
                    urls.push(self.store.public_url(&path));
                }
                Err(err) => {
                    tracing::warn!(path = %path, payload = %payload.describe(), error = %err, "photo upload failed");
                    failures.push(UploadFailure { index, path, reason: err.to_string() });
                }
            }
            on_progress(index + 1, payloads.len());
        }

        Ok(UploadReport { success: failures.is_empty(), urls, failures })
    }

    async fn write_one(&self, path: &str, payload: &PhotoPayload) -> SyncResult<()> {
        let blob = match payload {
            PhotoPayload::Remote(url) => self.fetcher.fetch(url).await?,
            inline => inline
                .decode_inline()
                .unwrap_or_else(|| Err(SyncError::Payload("empty payload".to_string())))?,
        };
        self.store.upload(path, blob, JPEG_CONTENT_TYPE).await
    }

    /// The folder the locator would read the entity's photos from, else the name itself.
    async fn target_folder(&self, names: &NameCandidates) -> String {
        match self.store.list("").await {
            Ok(root) => matching_folders(&root, names)
                .into_iter()
                .next()
                .unwrap_or_else(|| names.full.clone()),
            Err(err) => {
                tracing::warn!(error = %err, "root listing failed, uploading under the entity name");
                names.full.clone()
            }
        }
    }

    /// One past the highest `<base><N>.jpg` in `folder`, or 1. Fails when the
    /// highest number already is `u32::MAX`.
    pub async fn next_sequence(&self, folder: &str, base: &str) -> SyncResult<u32> {
        let pattern = format!(r"(?i)^{}(\d+)\.jpe?g$", regex::escape(base));
        let re = Regex::new(&pattern).map_err(|e| SyncError::Payload(e.to_string()))?;

        let max = self.store
            .list(folder)
            .await?
            .iter()
            .filter(|e| !e.is_folder)
            .filter_map(|e| re.captures(&e.name)?.get(1)?.as_str().parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        max.checked_add(1)
            .ok_or_else(|| SyncError::Store(format!("photo sequence exhausted in {}", folder)))
    }
}
