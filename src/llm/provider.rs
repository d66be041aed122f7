use async_trait::async_trait;

use crate::core::errors::AdvisorError;

/// Seam to the external text-completion / embedding service.
///
/// The service owns no structure: `complete` returns whatever text the
/// model produced and the composers own all validation of it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check that the backend is reachable and the credentials work
    async fn health_check(&self) -> Result<bool, AdvisorError>;

    /// text completion for a single prompt
    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError>;

    /// document embeddings, one vector per input
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError>;

    /// query embedding; may differ from document embedding in
    /// asymmetric-embedding schemes, defaults to the document path
    async fn embed_query(&self, input: &str) -> Result<Vec<f32>, AdvisorError> {
        let mut vectors = self.embed(std::slice::from_ref(&input.to_string())).await?;
        vectors.pop().ok_or_else(|| {
            AdvisorError::EmbeddingUnavailable("backend returned no vectors".to_string())
        })
    }
}
