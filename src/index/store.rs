//! In-memory vector index with an on-disk snapshot.
//!
//! Search is brute-force cosine similarity; corpus sizes here are a few
//! thousand chunks, well under where an ANN structure pays for itself.
//! Persistence is write-to-temp + atomic rename so a crash mid-write can
//! never corrupt the previously durable snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::AdvisorError;

use super::types::{Chunk, SearchHit, VectorRecord};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    next_chunk_id: u64,
    records: Vec<VectorRecord>,
}

#[derive(Debug, Default)]
pub struct VectorIndex {
    next_chunk_id: u64,
    records: Vec<VectorRecord>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a chunk and returns its id. Ids are monotonic and survive
    /// persist/load cycles; duplicates of existing content are tolerated
    /// and get fresh ids.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> u64 {
        let chunk_id = self.next_chunk_id;
        self.next_chunk_id += 1;
        self.records.push(VectorRecord {
            chunk_id,
            embedding,
            chunk,
        });
        chunk_id
    }

    /// Returns the `min(k, len)` most similar records, descending by
    /// score. The sort is stable, so equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .map(|record| SearchHit {
                chunk_id: record.chunk_id,
                chunk: record.chunk.clone(),
                score: cosine_similarity(query, &record.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    pub fn load(path: &Path) -> Result<Self, AdvisorError> {
        if !path.exists() {
            return Err(AdvisorError::IndexNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|e| AdvisorError::CorruptSnapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AdvisorError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(Self {
            next_chunk_id: snapshot.next_chunk_id,
            records: snapshot.records,
        })
    }

    pub fn persist(&self, path: &Path) -> Result<(), AdvisorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            next_chunk_id: self.next_chunk_id,
            records: self.records.clone(),
        };
        let data = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| AdvisorError::CorruptSnapshot(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::ChunkMetadata;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata::for_source("test"),
        }
    }

    #[test]
    fn search_orders_by_similarity() {
        let mut index = VectorIndex::new();
        index.insert(chunk("a"), vec![0.1, 0.9]);
        index.insert(chunk("b"), vec![1.0, 0.0]);
        index.insert(chunk("c"), vec![0.7, 0.3]);

        let hits = index.search(&[1.0, 0.0], 3);
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "a"]);

        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn search_returns_min_of_k_and_len() {
        let mut index = VectorIndex::new();
        index.insert(chunk("a"), vec![1.0, 0.0]);
        index.insert(chunk("b"), vec![0.0, 1.0]);

        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 1).len(), 1);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut index = VectorIndex::new();
        let first = index.insert(chunk("first"), vec![1.0, 0.0]);
        let second = index.insert(chunk("second"), vec![1.0, 0.0]);
        let third = index.insert(chunk("third"), vec![1.0, 0.0]);

        let hits = index.search(&[1.0, 0.0], 3);
        let ids: Vec<u64> = hits.iter().map(|h| h.chunk_id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[test]
    fn persist_then_load_reproduces_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        index.insert(chunk("alpha"), vec![1.0, 0.0, 0.0]);
        index.insert(chunk("beta"), vec![0.0, 1.0, 0.0]);
        index.insert(chunk("gamma"), vec![0.5, 0.5, 0.0]);

        let before = index.search(&[0.9, 0.1, 0.0], 3);
        index.persist(&path).unwrap();

        let reloaded = VectorIndex::load(&path).unwrap();
        let after = reloaded.search(&[0.9, 0.1, 0.0], 3);

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.chunk_id, b.chunk_id);
            assert_eq!(a.chunk.text, b.chunk.text);
        }
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        index.insert(chunk("a"), vec![1.0]);
        index.persist(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn chunk_ids_are_not_reused_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        let first = index.insert(chunk("a"), vec![1.0]);
        index.persist(&path).unwrap();

        let mut reloaded = VectorIndex::load(&path).unwrap();
        let second = reloaded.insert(chunk("b"), vec![1.0]);
        assert!(second > first);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AdvisorError::IndexNotFound(_)));
    }

    #[test]
    fn load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json at all").unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, AdvisorError::CorruptSnapshot(_)));
    }
}
