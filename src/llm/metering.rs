//! Usage metering around completion calls.
//!
//! `MeteredLlm` wraps a provider and records per-{model, operation} call
//! counts, estimated token usage, estimated cost, and latency. Metering is
//! an interceptor: the composers pass an operation name and stay free of
//! metrics code.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

use crate::core::errors::AdvisorError;

use super::provider::LlmProvider;

// Rough character-per-token ratio for latin-script prompts. Exact counts
// would need the model's tokenizer vocabulary, which the service does not
// ship; an estimate is enough for cost tracking.
const CHARS_PER_TOKEN: usize = 4;

// Blended USD price per 1k estimated tokens, prompt and completion
// averaged. Adjust alongside the configured model.
const USD_PER_1K_TOKENS: f64 = 0.000_45;

#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationUsage {
    pub calls: u64,
    pub failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_cost_usd: f64,
    pub total_latency_ms: u64,
}

/// Shared registry of usage, keyed by (model, operation).
#[derive(Default)]
pub struct UsageMetrics {
    by_operation: Mutex<BTreeMap<(String, String), OperationUsage>>,
}

impl UsageMetrics {
    pub fn record(
        &self,
        model: &str,
        operation: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        latency_ms: u64,
        failed: bool,
    ) {
        let mut map = match self.by_operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let usage = map
            .entry((model.to_string(), operation.to_string()))
            .or_default();
        usage.calls += 1;
        if failed {
            usage.failures += 1;
        }
        usage.prompt_tokens += prompt_tokens;
        usage.completion_tokens += completion_tokens;
        usage.estimated_cost_usd +=
            (prompt_tokens + completion_tokens) as f64 / 1000.0 * USD_PER_1K_TOKENS;
        usage.total_latency_ms += latency_ms;
    }

    /// Flat snapshot for the metrics endpoint.
    pub fn snapshot(&self) -> Vec<OperationMetrics> {
        let map = match self.by_operation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.iter()
            .map(|((model, operation), usage)| OperationMetrics {
                model: model.clone(),
                operation: operation.clone(),
                usage: usage.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub model: String,
    pub operation: String,
    #[serde(flatten)]
    pub usage: OperationUsage,
}

pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count().div_ceil(CHARS_PER_TOKEN)) as u64
}

/// Completion-call interceptor carrying an operation label.
#[derive(Clone)]
pub struct MeteredLlm {
    inner: Arc<dyn LlmProvider>,
    model: String,
    metrics: Arc<UsageMetrics>,
}

impl MeteredLlm {
    pub fn new(inner: Arc<dyn LlmProvider>, model: String, metrics: Arc<UsageMetrics>) -> Self {
        Self {
            inner,
            model,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<UsageMetrics> {
        self.metrics.clone()
    }

    pub async fn complete(&self, operation: &str, prompt: &str) -> Result<String, AdvisorError> {
        let prompt_tokens = estimate_tokens(prompt);
        let started = Instant::now();
        let result = self.inner.complete(prompt).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let completion_tokens = result
            .as_ref()
            .map(|text| estimate_tokens(text))
            .unwrap_or(0);
        self.metrics.record(
            &self.model,
            operation,
            prompt_tokens,
            completion_tokens,
            latency_ms,
            result.is_err(),
        );

        tracing::info!(
            model = %self.model,
            operation,
            prompt_tokens,
            completion_tokens,
            latency_ms,
            ok = result.is_ok(),
            "completion call"
        );

        result
    }
}
