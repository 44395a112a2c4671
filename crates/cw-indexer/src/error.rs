/// Indexer errors.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("splitter error: {0}")]
    Splitter(#[from] cw_splitter::SplitterError),

    #[error("storage error: {0}")]
    Storage(#[from] cw_storage::StorageError),

    #[error("remote error: {0}")]
    Remote(#[from] cw_remote::RemoteError),

    #[error("pipeline failed at stage '{stage}': {reason}")]
    PipelineFailed { stage: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }
}
