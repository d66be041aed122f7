//! Daily knowledge refresh.
//!
//! One cycle enumerates the known document sources, skips anything the
//! ledger says is current, and appends the rest to the index. A failing
//! source is isolated: it is neither recorded in the ledger nor allowed
//! to abort the remaining sources.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, NaiveTime};

use crate::core::errors::AdvisorError;
use crate::index::{IndexService, UpdateLedger};
use crate::ingest::DocumentProvider;

#[derive(Debug, Default)]
pub struct UpdateCycleReport {
    pub sources_seen: usize,
    pub sources_updated: usize,
    pub chunks_added: usize,
    pub failures: Vec<(String, String)>,
}

impl UpdateCycleReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Runs one incremental-update cycle. Idempotent: with no source changes
/// since the last run, the ledger suppresses every re-ingestion and no
/// chunks are added.
pub async fn run_update_cycle(
    index: &IndexService,
    ledger: &UpdateLedger,
    docs: &dyn DocumentProvider,
) -> Result<UpdateCycleReport, AdvisorError> {
    let sources = docs.list_sources().await?;

    let mut report = UpdateCycleReport {
        sources_seen: sources.len(),
        ..Default::default()
    };

    for source in sources {
        if !ledger.should_update(&source.source_id, source.modified_at) {
            continue;
        }

        let chunks = match docs.load_source(&source.source_id).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("source {} failed to load: {}", source.source_id, e);
                report.failures.push((source.source_id, e.to_string()));
                continue;
            }
        };

        match index.add(chunks).await {
            Ok(added) => {
                ledger.record(&source.source_id, source.modified_at);
                report.sources_updated += 1;
                report.chunks_added += added;
            }
            Err(e) => {
                tracing::warn!("source {} failed to index: {}", source.source_id, e);
                report.failures.push((source.source_id, e.to_string()));
            }
        }
    }

    tracing::info!(
        sources_seen = report.sources_seen,
        sources_updated = report.sources_updated,
        chunks_added = report.chunks_added,
        failures = report.failures.len(),
        "knowledge update cycle finished"
    );

    Ok(report)
}

/// Spawns the daily refresh task, firing at the given local time.
pub fn spawn_daily(
    index: Arc<IndexService>,
    ledger: UpdateLedger,
    docs: Arc<dyn DocumentProvider>,
    hour: u32,
    minute: u32,
) {
    tokio::spawn(async move {
        loop {
            let wait = duration_until(hour, minute);
            tracing::info!(
                "next knowledge refresh in {}s",
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;

            match run_update_cycle(index.as_ref(), &ledger, docs.as_ref()).await {
                Ok(report) if report.is_partial() => {
                    tracing::warn!(
                        "knowledge refresh partially succeeded ({} failures)",
                        report.failures.len()
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("knowledge refresh failed outright: {}", e);
                }
            }
        }
    });
}

fn duration_until(hour: u32, minute: u32) -> std::time::Duration {
    let target_time =
        NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or_default();
    let now = Local::now();
    let mut next = now.date_naive().and_time(target_time);
    if next <= now.naive_local() {
        next += ChronoDuration::days(1);
    }

    (next - now.naive_local())
        .to_std()
        .unwrap_or_else(|_| std::time::Duration::from_secs(24 * 60 * 60))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::index::{Chunk, ChunkMetadata};
    use crate::ingest::SourceInfo;
    use crate::llm::mock::MockLlm;

    /// Scripted corpus: named sources with mtimes, optional per-source
    /// failure injection.
    #[derive(Default)]
    struct ScriptedDocs {
        sources: Mutex<Vec<SourceInfo>>,
        chunks: Mutex<HashMap<String, Vec<Chunk>>>,
        failing: Mutex<Vec<String>>,
    }

    impl ScriptedDocs {
        fn add_source(&self, source_id: &str, modified_at: i64, texts: &[&str]) {
            self.sources.lock().unwrap().push(SourceInfo {
                source_id: source_id.to_string(),
                modified_at,
            });
            self.chunks.lock().unwrap().insert(
                source_id.to_string(),
                texts
                    .iter()
                    .map(|t| Chunk {
                        text: t.to_string(),
                        metadata: ChunkMetadata::for_source(source_id),
                    })
                    .collect(),
            );
        }

        fn fail_source(&self, source_id: &str) {
            self.failing.lock().unwrap().push(source_id.to_string());
        }

        fn touch(&self, source_id: &str, modified_at: i64) {
            for source in self.sources.lock().unwrap().iter_mut() {
                if source.source_id == source_id {
                    source.modified_at = modified_at;
                }
            }
        }
    }

    #[async_trait]
    impl DocumentProvider for ScriptedDocs {
        async fn list_sources(&self) -> Result<Vec<SourceInfo>, AdvisorError> {
            Ok(self.sources.lock().unwrap().clone())
        }

        async fn load_source(&self, source_id: &str) -> Result<Vec<Chunk>, AdvisorError> {
            if self.failing.lock().unwrap().iter().any(|s| s == source_id) {
                return Err(AdvisorError::SourceIngest {
                    source_id: source_id.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(self
                .chunks
                .lock()
                .unwrap()
                .get(source_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    async fn index_with(llm: Arc<MockLlm>, dir: &std::path::Path) -> IndexService {
        IndexService::build(
            llm,
            dir.join("index.json"),
            vec![Chunk {
                text: "seed".to_string(),
                metadata: ChunkMetadata::for_source("seed"),
            }],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn second_cycle_with_no_changes_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());
        let index = index_with(llm.clone(), dir.path()).await;
        let ledger = UpdateLedger::open(dir.path().join("ledger.json"));

        let docs = ScriptedDocs::default();
        docs.add_source("a.txt", 100, &["alpha one", "alpha two"]);
        docs.add_source("b.txt", 100, &["beta"]);

        let first = run_update_cycle(&index, &ledger, &docs).await.unwrap();
        assert_eq!(first.sources_updated, 2);
        assert_eq!(first.chunks_added, 3);

        let embed_calls_after_first = llm.embed_calls();
        let second = run_update_cycle(&index, &ledger, &docs).await.unwrap();
        assert_eq!(second.sources_updated, 0);
        assert_eq!(second.chunks_added, 0);
        assert_eq!(llm.embed_calls(), embed_calls_after_first);
        assert_eq!(index.len().await, 4);
    }

    #[tokio::test]
    async fn touched_source_is_reingested() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());
        let index = index_with(llm, dir.path()).await;
        let ledger = UpdateLedger::open(dir.path().join("ledger.json"));

        let docs = ScriptedDocs::default();
        docs.add_source("a.txt", 100, &["alpha"]);

        run_update_cycle(&index, &ledger, &docs).await.unwrap();
        docs.touch("a.txt", 200);

        let report = run_update_cycle(&index, &ledger, &docs).await.unwrap();
        assert_eq!(report.sources_updated, 1);
        assert_eq!(report.chunks_added, 1);
    }

    #[tokio::test]
    async fn failing_source_is_isolated_and_unrecorded() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::new());
        let index = index_with(llm, dir.path()).await;
        let ledger = UpdateLedger::open(dir.path().join("ledger.json"));

        let docs = ScriptedDocs::default();
        docs.add_source("a.txt", 100, &["alpha"]);
        docs.add_source("b.txt", 100, &["beta"]);
        docs.fail_source("a.txt");

        let report = run_update_cycle(&index, &ledger, &docs).await.unwrap();
        assert!(report.is_partial());
        assert_eq!(report.sources_updated, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "a.txt");

        // a.txt was not recorded, so it is retried next cycle
        assert!(ledger.should_update("a.txt", 100));
        assert!(!ledger.should_update("b.txt", 100));
    }

    #[test]
    fn duration_until_is_always_in_the_future() {
        let wait = duration_until(3, 0);
        assert!(wait.as_secs() > 0);
        assert!(wait.as_secs() <= 24 * 60 * 60);
    }
}
