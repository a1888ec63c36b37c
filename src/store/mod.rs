//! Object store seam: the bucket operations the photo subsystem consumes.

pub mod memory;
pub mod s3_store;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

use crate::config::StoreConfig;
use crate::sync_error::SyncResult;

pub use memory::MemoryStore;
pub use s3_store::StoreClient;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub name: String,
    pub is_folder: bool,
}

impl StoreEntry {
    pub fn file(name: impl Into<String>) -> Self {
        StoreEntry { name: name.into(), is_folder: false }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        StoreEntry { name: name.into(), is_folder: true }
    }

    /// Listings that cannot tell folders from objects treat dotless names as folders.
    pub fn guess(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_folder = !name.contains('.');
        StoreEntry { name, is_folder }
    }

    pub fn is_jpeg(&self) -> bool {
        !self.is_folder && is_jpeg_name(&self.name)
    }
}

pub fn is_jpeg_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

pub fn join_path(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder.trim_end_matches('/'), name)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> SyncResult<Vec<String>>;

    /// Immediate children of `folder`; the empty string lists the bucket root.
    /// A folder that does not exist lists as empty.
    async fn list(&self, folder: &str) -> SyncResult<Vec<StoreEntry>>;

    /// Writes `blob` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, blob: Bytes, content_type: &str) -> SyncResult<()>;

    /// Removes the given objects and returns the paths that actually existed.
    async fn remove(&self, paths: &[String]) -> SyncResult<Vec<String>>;

    fn public_urls(&self) -> &PublicUrls;

    fn public_url(&self, path: &str) -> String {
        self.public_urls().url_for(path)
    }
}

/// Path of an object inside the bucket, e.g. `Luna/luna3.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        ObjectPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("not an absolute url")]
    InvalidUrl,
    #[error("url does not point into the bucket")]
    MissingMarker,
    #[error("url has no object path")]
    Empty,
    #[error("object path is not valid utf-8")]
    InvalidEncoding,
}

/// Maps object paths to public URLs and back.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    prefix: String,
    marker: String,
}

impl PublicUrls {
    pub fn new(config: &StoreConfig) -> Self {
        PublicUrls {
            prefix: config.public_url_prefix(),
            marker: config.public_marker(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}", self.prefix, encoded)
    }

    /// Recovers the object path from a public URL, ignoring any query string.
    pub fn object_path(&self, url: &str) -> Result<ObjectPath, PathParseError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| PathParseError::InvalidUrl)?;
        let path = parsed.path();
        let start = path
            .find(&self.marker)
            .map(|idx| idx + self.marker.len())
            .ok_or(PathParseError::MissingMarker)?;

        let raw = &path[start..];
        if raw.is_empty() {
            return Err(PathParseError::Empty);
        }

        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| PathParseError::InvalidEncoding)?;
        Ok(ObjectPath::new(decoded.into_owned()))
    }
}

/// Last path segment of a URL with query and fragment removed, URL-decoded.
pub fn bare_filename(url: &str) -> Option<String> {
    let without_query = url.split(|c: char| c == '?' || c == '#').next()?;
    let segment = without_query.trim_end_matches('/').rsplit('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}
