//! Photo lookup, upload, deletion and reconciliation for the shelter's cat
//! records, backed by an S3-compatible bucket.

pub mod config;
pub mod deleter;
pub mod file;
pub mod locator;
pub mod model;
pub mod names;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod sync_error;
pub mod uploader;

pub use config::{PhotoConfig, RetryPolicy};
pub use deleter::{DeleteOutcome, PhotoDeleter};
pub use locator::{LocateMode, PhotoLocator};
pub use model::payload::PhotoPayload;
pub use model::photo::{Generation, PhotoHandle};
pub use model::photo_album::PhotoSet;
pub use reconcile::Reconciler;
pub use service::{verify_storage, PhotoService, StorageStatus};
pub use store::{MemoryStore, ObjectStore, StoreClient};
pub use sync_error::{SyncError, SyncResult};
pub use uploader::{HttpFetcher, PhotoUploader, UploadReport};
