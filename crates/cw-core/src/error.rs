/// Errors from cw-core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid language tag: {tag}")]
    InvalidLanguageTag { tag: String },

    #[error("invalid chunk id: {value}")]
    InvalidChunkId { value: String },
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
