use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::LlmConfig;
use crate::core::errors::AdvisorError;

use super::provider::LlmProvider;

/// Client for any OpenAI-compatible API (`/v1/chat/completions` and
/// `/v1/embeddings`).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            client: Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_raw(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::EmbeddingUnavailable(e.to_string()))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AdvisorError::EmbeddingUnavailable(text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| AdvisorError::EmbeddingUnavailable(e.to_string()))?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(AdvisorError::EmbeddingUnavailable(format!(
                "requested {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, AdvisorError> {
        // A tiny embedding round-trip exercises both connectivity and
        // credentials, which a bare /v1/models listing would not.
        match self.embed_raw(&["health check".to_string()]).await {
            Ok(vectors) => Ok(!vectors.is_empty()),
            Err(_) => Ok(false),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::CompletionUnavailable(e.to_string()))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AdvisorError::CompletionUnavailable(text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| AdvisorError::CompletionUnavailable(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_raw(inputs).await
    }
}
