/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("vector index unavailable: {reason}")]
    VectorIndexUnavailable { reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("lock held by pid {pid} (operation: {operation})")]
    LockContended { pid: u32, operation: String },

    #[error("home directory unavailable")]
    NoHomeDirectory,
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Sqlite(e) => is_sqlite_busy(e),
            Self::LockContended { .. } => true,
            _ => false,
        }
    }
}

fn is_sqlite_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseBusy,
                ..
            },
            _
        )
    )
}
