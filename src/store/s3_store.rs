use async_trait::async_trait;
use bytes::Bytes;
use rusoto_core::{HttpClient, Client, Region, RusotoError};
use rusoto_credential::{EnvironmentProvider, StaticProvider};
use rusoto_s3::{
    DeleteObjectRequest, HeadObjectError, HeadObjectRequest, ListObjectsV2Request,
    PutObjectRequest, S3Client, StreamingBody, S3,
};

use crate::config::StoreConfig;
use crate::store::{ObjectStore, PublicUrls, StoreEntry};
use crate::sync_error::{SyncError, SyncResult};

/// Bucket client speaking the S3 protocol.
#[derive(Clone)]
pub struct StoreClient {
    inner: S3Client,
    bucket: String,
    urls: PublicUrls,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> SyncResult<StoreClient> {
        let dispatcher = HttpClient::new().map_err(SyncError::store)?;

        let client = match (&config.access_key, &config.secret_key) {
            (Some(key), Some(secret)) => Client::new_with(
                StaticProvider::new_minimal(key.clone(), secret.clone()),
                dispatcher,
            ),
            _ => Client::new_with(EnvironmentProvider::default(), dispatcher),
        };

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                name: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.region.parse().unwrap_or(Region::UsEast1),
        };
        let inner = S3Client::new_with_client(client, region);

        Ok(StoreClient {
            inner,
            bucket: config.bucket.clone(),
            urls: PublicUrls::new(config),
        })
    }

    async fn exists(&self, key: &str) -> SyncResult<bool> {
        let req = HeadObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_owned(),
            ..HeadObjectRequest::default()
        };

        match self.inner.head_object(req).await {
            Ok(_) => Ok(true),
            Err(RusotoError::Service(HeadObjectError::NoSuchKey(_))) => Ok(false),
            Err(RusotoError::Unknown(res)) if res.status.as_u16() == 404 => Ok(false),
            Err(err) => Err(SyncError::store(err)),
        }
    }
}

#[async_trait]
impl ObjectStore for StoreClient {
    async fn list_buckets(&self) -> SyncResult<Vec<String>> {
        let res = self.inner.list_buckets().await.map_err(SyncError::store)?;

        let names = res.buckets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|b| b.name)
            .collect();

        Ok(names)
    }

    async fn list(&self, folder: &str) -> SyncResult<Vec<StoreEntry>> {
        let prefix = if folder.is_empty() {
            None
        } else {
            Some(format!("{}/", folder.trim_end_matches('/')))
        };
        let strip = prefix.clone().unwrap_or_default();

        let mut entries = Vec::new();
        let mut continuation_token = None;
        loop {
            let req = ListObjectsV2Request {
                bucket: self.bucket.clone(),
                delimiter: Some("/".to_owned()),
                prefix: prefix.clone(),
                continuation_token: continuation_token.take(),
                ..ListObjectsV2Request::default()
            };

            let resp = self.inner
                .list_objects_v2(req)
                .await
                .map_err(SyncError::store)?;

            let folders = resp.common_prefixes
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.prefix)
                .map(|p| StoreEntry::folder(p[strip.len()..].trim_end_matches('/')));
            entries.extend(folders);

            let files = resp.contents
                .unwrap_or_default()
                .into_iter()
                .filter_map(|o| o.key)
                .filter(|k| k.len() > strip.len())
                .map(|k| StoreEntry::file(&k[strip.len()..]));
            entries.extend(files);

            match resp.next_continuation_token {
                Some(token) if resp.is_truncated.unwrap_or(false) => continuation_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(folder, count = entries.len(), "listed bucket folder");
        Ok(entries)
    }

    async fn upload(&self, path: &str, blob: Bytes, content_type: &str) -> SyncResult<()> {
        let req = PutObjectRequest {
            key: path.to_owned(),
            body: Some(StreamingBody::from(blob.to_vec())),
            bucket: self.bucket.clone(),
            content_type: Some(content_type.to_owned()),
            ..Default::default()
        };

        self.inner.put_object(req).await.map_err(SyncError::store)?;
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> SyncResult<Vec<String>> {
        let mut removed = Vec::new();
        for path in paths {
            // S3 acknowledges deletes of missing keys, so check first
            if !self.exists(path).await? {
                continue;
            }

            let req = DeleteObjectRequest {
                bucket: self.bucket.clone(),
                key: path.clone(),
                ..DeleteObjectRequest::default()
            };
            self.inner.delete_object(req).await.map_err(SyncError::store)?;
            removed.push(path.clone());
        }

        Ok(removed)
    }

    fn public_urls(&self) -> &PublicUrls {
        &self.urls
    }
}
