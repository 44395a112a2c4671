use serde::Deserialize;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::embed::request_error;
use crate::error::RemoteError;
use crate::retry::with_retries;

/// One reranked candidate: the index into the submitted document list plus
/// the model's relevance score.
#[derive(Debug, Clone, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub relevance_score: f64,
}

/// Contract boundary for the rerank service.
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>, RemoteError>;
}

/// Blocking HTTP reranker.
pub struct HttpReranker {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpReranker {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            base_url: config.reranker_base_url.trim_end_matches('/').to_string(),
            api_key: config.reranker_api_key.clone(),
            model: config.reranker_model.clone(),
        }
    }
}

impl Reranker for HttpReranker {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>, RemoteError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "top_n": top_n,
            "return_documents": false,
        });

        let response = with_retries("rerank", || {
            self.agent
                .post(&url)
                .set("Authorization", &format!("Bearer {}", self.api_key))
                .send_json(body.clone())
                .map_err(|e| request_error("rerank", e))
        })?;

        let payload: Value = response
            .into_json()
            .map_err(|e| RemoteError::MalformedResponse {
                service: "rerank",
                reason: e.to_string(),
            })?;

        let raw = payload
            .get("results")
            .and_then(Value::as_array)
            .ok_or(RemoteError::MalformedResponse {
                service: "rerank",
                reason: "missing results array".to_string(),
            })?;

        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_value::<RerankResult>(entry.clone()) {
                Ok(result) => out.push(result),
                Err(e) => {
                    return Err(RemoteError::MalformedResponse {
                        service: "rerank",
                        reason: format!("bad result entry: {e}"),
                    })
                }
            }
        }
        Ok(out)
    }
}
