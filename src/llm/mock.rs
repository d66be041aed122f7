//! Scripted provider for tests: queued completions, an exact-text
//! embedding table with a deterministic fallback, and call counters.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::AdvisorError;

use super::provider::LlmProvider;

#[derive(Default)]
pub struct MockLlm {
    completions: Mutex<VecDeque<String>>,
    embeddings: Mutex<HashMap<String, Vec<f32>>>,
    embedded_texts: Mutex<Vec<String>>,
    complete_calls: AtomicUsize,
    embed_calls: AtomicUsize,
    fail_embeddings: AtomicBool,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_completion(&self, text: &str) {
        self.completions
            .lock()
            .unwrap()
            .push_back(text.to_string());
    }

    pub fn set_embedding(&self, text: &str, vector: Vec<f32>) {
        self.embeddings
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn fail_embeddings(&self, fail: bool) {
        self.fail_embeddings.store(fail, Ordering::SeqCst);
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Every text embedded so far, in call order.
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded_texts.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.embeddings.lock().unwrap().get(text) {
            return vector.clone();
        }
        // Deterministic fallback so unspecified texts still embed: a tiny
        // bag-of-bytes signature, stable across runs.
        let bytes = text.as_bytes();
        let sum: u32 = bytes.iter().map(|b| *b as u32).sum();
        let len = bytes.len().max(1) as f32;
        vec![
            len / 64.0,
            (sum % 97) as f32 / 97.0,
            *bytes.first().unwrap_or(&0) as f32 / 255.0,
            *bytes.last().unwrap_or(&0) as f32 / 255.0,
        ]
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, AdvisorError> {
        Ok(!self.fail_embeddings.load(Ordering::SeqCst))
    }

    async fn complete(&self, _prompt: &str) -> Result<String, AdvisorError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AdvisorError::CompletionUnavailable("mock exhausted".to_string()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings.load(Ordering::SeqCst) {
            return Err(AdvisorError::EmbeddingUnavailable(
                "mock embedding failure".to_string(),
            ));
        }
        self.embedded_texts
            .lock()
            .unwrap()
            .extend(inputs.iter().cloned());
        Ok(inputs.iter().map(|text| self.vector_for(text)).collect())
    }
}
