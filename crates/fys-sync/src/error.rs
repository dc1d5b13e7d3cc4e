use fys_client::ClientError;
use fys_core::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

impl SyncError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Client(e) if e.is_unauthorized())
    }
}
