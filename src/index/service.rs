//! Process-wide index service.
//!
//! Owns the in-memory `VectorIndex` behind a `RwLock` (single-writer
//! discipline: `add`/`build` take the write lock, `search` a read lock)
//! and the snapshot path. Embedding happens outside the lock so slow
//! backend calls never serialize concurrent reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::errors::AdvisorError;
use crate::ingest::DocumentProvider;
use crate::llm::LlmProvider;

use super::store::VectorIndex;
use super::types::{Chunk, SearchHit};

pub struct IndexService {
    llm: Arc<dyn LlmProvider>,
    index: RwLock<VectorIndex>,
    snapshot_path: PathBuf,
}

impl std::fmt::Debug for IndexService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexService")
            .field("snapshot_path", &self.snapshot_path)
            .finish_non_exhaustive()
    }
}

impl IndexService {
    /// Loads the persisted index, falling back to a full build from the
    /// document collaborator when no snapshot exists. A corrupt snapshot
    /// is rebuilt the same way; the corpus on disk is the source of truth.
    ///
    /// Fails with `EmptyCorpus` when there is nothing to load and the
    /// collaborator yields zero chunks: with no content the service has
    /// nothing to serve, so startup must not proceed.
    pub async fn open(
        llm: Arc<dyn LlmProvider>,
        snapshot_path: PathBuf,
        docs: &dyn DocumentProvider,
    ) -> Result<Self, AdvisorError> {
        match VectorIndex::load(&snapshot_path) {
            Ok(index) => {
                tracing::info!(
                    "loaded vector index from {} ({} chunks)",
                    snapshot_path.display(),
                    index.len()
                );
                Ok(Self {
                    llm,
                    index: RwLock::new(index),
                    snapshot_path,
                })
            }
            Err(AdvisorError::IndexNotFound(_)) => {
                tracing::info!("no persisted index, building from document corpus");
                Self::build(llm, snapshot_path, docs.load_all().await?).await
            }
            Err(AdvisorError::CorruptSnapshot(reason)) => {
                tracing::warn!("discarding corrupt index snapshot: {}", reason);
                Self::build(llm, snapshot_path, docs.load_all().await?).await
            }
            Err(e) => Err(e),
        }
    }

    /// Embeds all chunks, creates a fresh index and persists it.
    pub async fn build(
        llm: Arc<dyn LlmProvider>,
        snapshot_path: PathBuf,
        chunks: Vec<Chunk>,
    ) -> Result<Self, AdvisorError> {
        if chunks.is_empty() {
            return Err(AdvisorError::EmptyCorpus);
        }

        let embeddings = embed_chunks(llm.as_ref(), &chunks).await?;

        let mut index = VectorIndex::new();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding);
        }

        tracing::info!("built vector index with {} chunks", index.len());
        if let Err(e) = index.persist(&snapshot_path) {
            tracing::error!(
                "fresh index built but persisting to {} failed: {}",
                snapshot_path.display(),
                e
            );
        }

        Ok(Self {
            llm,
            index: RwLock::new(index),
            snapshot_path,
        })
    }

    /// Embeds and appends new chunks without touching existing vectors,
    /// then persists. Overlapping content is tolerated: duplicates get
    /// fresh ids and downstream ranking handles near-duplicate hits.
    ///
    /// A persistence failure is logged, not returned; the in-memory index
    /// stays authoritative for the rest of the process lifetime.
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<usize, AdvisorError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = embed_chunks(self.llm.as_ref(), &chunks).await?;

        let mut index = self.index.write().await;
        let added = chunks.len();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding);
        }

        if let Err(e) = index.persist(&self.snapshot_path) {
            tracing::error!(
                "index updated in memory but persisting to {} failed: {}",
                self.snapshot_path.display(),
                e
            );
        }

        Ok(added)
    }

    /// Embeds the query and returns up to `k` nearest chunks.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<SearchHit>, AdvisorError> {
        let query = self.llm.embed_query(query_text).await?;
        let index = self.index.read().await;
        Ok(index.search(&query, k.max(1)))
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

async fn embed_chunks(
    llm: &dyn LlmProvider,
    chunks: &[Chunk],
) -> Result<Vec<Vec<f32>>, AdvisorError> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = llm.embed(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(AdvisorError::EmbeddingUnavailable(format!(
            "embedded {} of {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::ChunkMetadata;
    use crate::llm::mock::MockLlm;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata::for_source("test"),
        }
    }

    struct NoDocs;

    #[async_trait::async_trait]
    impl DocumentProvider for NoDocs {
        async fn list_sources(&self) -> Result<Vec<crate::ingest::SourceInfo>, AdvisorError> {
            Ok(Vec::new())
        }

        async fn load_source(&self, _source_id: &str) -> Result<Vec<Chunk>, AdvisorError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn build_from_empty_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());

        let err = IndexService::build(llm, dir.path().join("index.json"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyCorpus));
    }

    #[tokio::test]
    async fn open_without_snapshot_and_empty_docs_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());

        let err = IndexService::open(llm, dir.path().join("index.json"), &NoDocs)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyCorpus));
    }

    #[tokio::test]
    async fn build_search_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let llm = Arc::new(MockLlm::new());
        llm.set_embedding("bond fund", vec![1.0, 0.0]);
        llm.set_embedding("equity fund", vec![0.0, 1.0]);
        llm.set_embedding("safe income", vec![0.9, 0.1]);

        let service = IndexService::build(
            llm.clone(),
            path.clone(),
            vec![chunk("bond fund"), chunk("equity fund")],
        )
        .await
        .unwrap();

        let hits = service.search("safe income", 2).await.unwrap();
        assert_eq!(hits[0].chunk.text, "bond fund");

        // reopen from the snapshot: no re-embedding of documents
        let embeds_before = llm.embedded_texts().len();
        let reopened = IndexService::open(llm.clone(), path, &NoDocs).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        assert_eq!(llm.embedded_texts().len(), embeds_before);

        let hits = reopened.search("safe income", 2).await.unwrap();
        assert_eq!(hits[0].chunk.text, "bond fund");
    }

    #[tokio::test]
    async fn add_embeds_only_the_delta() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());

        let service = IndexService::build(
            llm.clone(),
            dir.path().join("index.json"),
            vec![chunk("existing fund")],
        )
        .await
        .unwrap();

        let added = service.add(vec![chunk("new fund")]).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(service.len().await, 2);

        let embedded = llm.embedded_texts();
        assert_eq!(embedded, vec!["existing fund", "new fund"]);
    }

    #[tokio::test]
    async fn embedding_failure_surfaces_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());

        let service = IndexService::build(
            llm.clone(),
            dir.path().join("index.json"),
            vec![chunk("a fund")],
        )
        .await
        .unwrap();

        llm.fail_embeddings(true);
        let err = service.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, AdvisorError::EmbeddingUnavailable(_)));
    }
}
