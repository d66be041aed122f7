//! Typed configuration loaded from `config.yml`, with env overrides for
//! anything deployment-specific. Every field has a default so a missing or
//! partial file still yields a runnable service.

mod paths;

pub use paths::AppPaths;

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub embedding_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from the similarity search. Must be >= the
    /// shortlist size so the weighting step has room to reorder.
    pub search_k: usize,
    /// Final shortlist size handed to the composer.
    pub shortlist_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_k: 5,
            shortlist_size: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local hour at which the daily knowledge refresh fires.
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 3, minute: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8484 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
}

impl AdvisorConfig {
    /// Loads `config.yml` from the given directory, falling back to
    /// defaults when the file is absent. A file that exists but fails to
    /// parse is an error; silently ignoring a typo-ridden config is worse
    /// than refusing to start.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join("config.yml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: AdvisorConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Looks for `config.yml` in the working directory first, then the
    /// crate root (the development layout).
    pub fn discover() -> anyhow::Result<Self> {
        if let Ok(cwd) = std::env::current_dir() {
            if cwd.join("config.yml").exists() {
                return Self::load(&cwd);
            }
        }
        Self::load(Path::new(env!("CARGO_MANIFEST_DIR")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = AdvisorConfig::default();
        assert!(config.retrieval.search_k >= config.retrieval.shortlist_size);
        assert_eq!(config.retrieval.shortlist_size, 3);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: AdvisorConfig =
            serde_yaml::from_str("llm:\n  model: test-model\n").unwrap();
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.retrieval.search_k, 5);
        assert_eq!(config.schedule.hour, 3);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdvisorConfig::load(dir.path()).unwrap();
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }
}
