use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the photo subsystem and its store backends.
///
/// Only `MissingIdentity` and `MissingPhotoUrl` ever cross the public photo
/// operations; everything else is logged and absorbed by the strategy chains.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot {0} photos without an entity name")]
    MissingIdentity(&'static str),

    #[error("no photo url was provided")]
    MissingPhotoUrl,

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{0}")]
    Usage(String),

    #[error("cannot render output: {0}")]
    Json(#[from] json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        SyncError::Store(err.to_string())
    }

    /// True for the errors that abort an operation before any store call.
    pub fn is_identity(&self) -> bool {
        matches!(self, SyncError::MissingIdentity(_) | SyncError::MissingPhotoUrl)
    }
}
