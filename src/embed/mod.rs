//! External embedding provider client
//!
//! The core never turns text into vectors itself; it accepts vectors as
//! given. This client backs the REST passthrough endpoint only, speaking
//! the common OpenAI-compatible `/embeddings` shape and configured purely
//! from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::constants::{ENV_EMBEDDINGS_API_KEY, ENV_EMBEDDINGS_MODEL, ENV_EMBEDDINGS_URL};
use crate::error::{Result, VectorDbError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbeddingApiRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiItem {
    embedding: Vec<f32>,
}

/// Thin client for an OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    /// Build a client from `VECTORDB_EMBEDDINGS_*` environment variables;
    /// returns None when no endpoint is configured, in which case the
    /// passthrough endpoint reports itself unavailable
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ENV_EMBEDDINGS_URL).ok()?;
        let api_key = std::env::var(ENV_EMBEDDINGS_API_KEY).unwrap_or_default();
        let model = std::env::var(ENV_EMBEDDINGS_MODEL)
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        Some(Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            url,
            api_key,
            model,
        })
    }

    /// Fetch the embedding for one text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(VectorDbError::validation("text must not be empty"));
        }

        debug!(model = %self.model, chars = text.len(), "requesting embedding");
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingApiRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| VectorDbError::internal(format!("embedding provider: {e}")))?;

        if !response.status().is_success() {
            return Err(VectorDbError::internal(format!(
                "embedding provider returned {}",
                response.status()
            )));
        }

        let body: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| VectorDbError::internal(format!("embedding provider body: {e}")))?;
        body.data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| VectorDbError::internal("embedding provider returned no data"))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
