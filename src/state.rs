use std::sync::Arc;

use thiserror::Error;

use crate::advisor::AdvisorService;
use crate::composer::{RebalanceComposer, RecommendComposer};
use crate::core::config::{AdvisorConfig, AppPaths};
use crate::core::errors::AdvisorError;
use crate::index::{IndexService, UpdateLedger};
use crate::ingest::{DocumentProvider, FsDocumentProvider};
use crate::llm::{LlmProvider, MeteredLlm, OpenAiProvider, UsageMetrics};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("index initialization failed: {0}")]
    Index(#[from] AdvisorError),
}

/// Application state shared by request handlers and the refresh task.
///
/// Initialization order matters: the embedding/completion provider first,
/// then the index (which may need it for a cold build), then the
/// completion-bound composers on top.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AdvisorConfig,
    pub llm: Arc<dyn LlmProvider>,
    pub metrics: Arc<UsageMetrics>,
    pub index: Arc<IndexService>,
    pub ledger: UpdateLedger,
    pub docs: Arc<dyn DocumentProvider>,
    pub advisor: AdvisorService,
}

impl AppState {
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config =
            AdvisorConfig::discover().map_err(|e| InitializationError::Config(e.to_string()))?;

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(&config.llm));
        let metrics = Arc::new(UsageMetrics::default());

        let docs: Arc<dyn DocumentProvider> =
            Arc::new(FsDocumentProvider::new(paths.docs_dir.clone()));

        // Cold start builds from the corpus; an empty corpus with no prior
        // snapshot is the one unrecoverable condition.
        let index = Arc::new(
            IndexService::open(llm.clone(), paths.index_path.clone(), docs.as_ref()).await?,
        );
        let ledger = UpdateLedger::open(paths.ledger_path.clone());

        let metered = MeteredLlm::new(llm.clone(), config.llm.model.clone(), metrics.clone());
        let advisor = AdvisorService::new(
            index.clone(),
            RecommendComposer::new(metered.clone(), config.retrieval.shortlist_size),
            RebalanceComposer::new(metered),
            config.retrieval.search_k,
            config.retrieval.shortlist_size,
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            llm,
            metrics,
            index,
            ledger,
            docs,
            advisor,
        }))
    }
}
