/// Remote service errors.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("http error from {service}: status {status}: {message}")]
    Http {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("transport error talking to {service}: {reason}")]
    Transport { service: &'static str, reason: String },

    #[error("malformed response from {service}: {reason}")]
    MalformedResponse { service: &'static str, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("missing configuration: {variable}")]
    MissingConfig { variable: &'static str },

    #[error("retries exhausted for {service} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        service: &'static str,
        attempts: u32,
        last_error: String,
    },
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Http { status: 429, .. })
    }
}
