/// Retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("storage error: {0}")]
    Storage(#[from] cw_storage::StorageError),

    #[error("remote error: {0}")]
    Remote(#[from] cw_remote::RemoteError),

    #[error("query error: {reason}")]
    QueryFailed { reason: String },
}

impl RetrievalError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }
}
