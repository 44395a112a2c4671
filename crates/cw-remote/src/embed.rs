use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::retry::with_retries;

/// Texts per embedding request.
const EMBED_BATCH_SIZE: usize = 32;

/// Contract boundary for the embedding service.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts. The returned vectors are in input order and
    /// dimension-checked.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RemoteError>;
}

/// Blocking HTTP embedder.
pub struct HttpEmbedder {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            base_url: config.embedding_base_url.trim_end_matches('/').to_string(),
            api_key: config.embedding_api_key.clone(),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RemoteError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dimensions,
        });

        let response = with_retries("embedding", || {
            self.agent
                .post(&url)
                .set("Authorization", &format!("Bearer {}", self.api_key))
                .send_json(body.clone())
                .map_err(|e| request_error("embedding", e))
        })?;

        let payload: Value = response
            .into_json()
            .map_err(|e| RemoteError::MalformedResponse {
                service: "embedding",
                reason: e.to_string(),
            })?;

        let data = payload
            .get("data")
            .and_then(Value::as_array)
            .ok_or(RemoteError::MalformedResponse {
                service: "embedding",
                reason: "missing data array".to_string(),
            })?;

        if data.len() != texts.len() {
            return Err(RemoteError::MalformedResponse {
                service: "embedding",
                reason: format!("expected {} embeddings, got {}", texts.len(), data.len()),
            });
        }

        let mut out = Vec::with_capacity(data.len());
        for entry in data {
            let raw = entry
                .get("embedding")
                .and_then(Value::as_array)
                .ok_or(RemoteError::MalformedResponse {
                    service: "embedding",
                    reason: "missing embedding array".to_string(),
                })?;
            let vector: Vec<f32> = raw
                .iter()
                .filter_map(Value::as_f64)
                .map(|v| v as f32)
                .collect();
            if vector.len() != self.dimensions {
                return Err(RemoteError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
            out.push(vector);
        }
        Ok(out)
    }
}

impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RemoteError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }
}

/// Map a ureq failure into the shared error type, extracting the service's
/// `{error:{message}}` body when present.
pub(crate) fn request_error(service: &'static str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<Value>()
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "unknown error".to_string());
            RemoteError::Http {
                service,
                status,
                message,
            }
        }
        ureq::Error::Transport(t) => RemoteError::Transport {
            service,
            reason: t.to_string(),
        },
    }
}
