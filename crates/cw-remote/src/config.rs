use crate::error::RemoteError;

/// Environment-driven configuration for the embedding and rerank services.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub embedding_base_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub reranker_base_url: String,
    pub reranker_api_key: String,
    pub reranker_model: String,
    pub reranker_top_n: usize,
}

impl RemoteConfig {
    /// Read the full configuration from the environment.
    pub fn from_env() -> Result<Self, RemoteError> {
        Ok(Self {
            embedding_base_url: require("EMBEDDING_BASE_URL")?,
            embedding_api_key: require("EMBEDDING_API_KEY")?,
            embedding_model: require("EMBEDDING_MODEL")?,
            embedding_dimensions: optional("EMBEDDING_DIMENSIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            reranker_base_url: require("RERANKER_BASE_URL")?,
            reranker_api_key: require("RERANKER_API_KEY")?,
            reranker_model: require("RERANKER_MODEL")?,
            reranker_top_n: optional("RERANKER_TOP_N")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        })
    }
}

fn require(variable: &'static str) -> Result<String, RemoteError> {
    std::env::var(variable)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(RemoteError::MissingConfig { variable })
}

fn optional(variable: &str) -> Option<String> {
    std::env::var(variable).ok().filter(|v| !v.is_empty())
}
