/// Splitter errors.
#[derive(Debug, thiserror::Error)]
pub enum SplitterError {
    #[error("no grammar for language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("parse failed for {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("invalid encoding in {path}")]
    InvalidEncoding { path: String },
}

impl SplitterError {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
