//! Document collaborator seam.
//!
//! The retrieval core never reads raw files itself; a `DocumentProvider`
//! hands it normalized `(text, metadata)` chunks per source. The bundled
//! `FsDocumentProvider` covers the common deployment (a docs directory of
//! prospectus text files plus a fund-catalog CSV).

mod chunker;
mod fs;

pub use chunker::TextChunker;
pub use fs::FsDocumentProvider;

use async_trait::async_trait;

use crate::core::errors::AdvisorError;
use crate::index::Chunk;

/// A known document source and when it last changed (unix seconds).
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source_id: String,
    pub modified_at: i64,
}

#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Enumerates every known source with its modification time.
    async fn list_sources(&self) -> Result<Vec<SourceInfo>, AdvisorError>;

    /// Loads one source as normalized chunks.
    async fn load_source(&self, source_id: &str) -> Result<Vec<Chunk>, AdvisorError>;

    /// Loads the whole corpus for an initial build. A source that fails
    /// to load is skipped with a warning; the cold-start build should not
    /// be held hostage by one bad file.
    async fn load_all(&self) -> Result<Vec<Chunk>, AdvisorError> {
        let mut chunks = Vec::new();
        for source in self.list_sources().await? {
            match self.load_source(&source.source_id).await {
                Ok(loaded) => chunks.extend(loaded),
                Err(e) => {
                    tracing::warn!("skipping source {} during full load: {}", source.source_id, e);
                }
            }
        }
        Ok(chunks)
    }
}
