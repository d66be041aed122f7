//! Per-source last-modified ledger driving idempotent incremental updates.
//!
//! Entries are a superset of every source successfully ingested; a source
//! later deleted from disk is never purged (a stale entry only suppresses
//! re-embedding work, it cannot cause incorrect results).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct UpdateLedger {
    inner: Arc<Mutex<BTreeMap<String, i64>>>,
    path: PathBuf,
}

impl UpdateLedger {
    /// Loads the ledger from disk, starting empty when the file is absent
    /// or unreadable.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, i64>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("update ledger at {} unreadable: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(entries)),
            path,
        }
    }

    /// True when the source is unseen or its stored timestamp is strictly
    /// older than `modified_at`.
    pub fn should_update(&self, source_id: &str, modified_at: i64) -> bool {
        let map = self.lock();
        match map.get(source_id) {
            Some(stored) => *stored < modified_at,
            None => true,
        }
    }

    /// Upserts the entry and persists the ledger. A failed save is logged
    /// and tolerated; the worst case is one redundant re-ingestion after a
    /// restart.
    pub fn record(&self, source_id: &str, modified_at: i64) {
        let snapshot = {
            let mut map = self.lock();
            map.insert(source_id.to_string(), modified_at);
            map.clone()
        };

        if let Err(e) = self.save(&snapshot) {
            tracing::warn!(
                "failed to persist update ledger at {}: {}",
                self.path.display(),
                e
            );
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, i64>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn save(&self, entries: &BTreeMap<String, i64>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_source_needs_update() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = UpdateLedger::open(dir.path().join("ledger.json"));

        assert!(ledger.should_update("a.pdf", 100));

        ledger.record("a.pdf", 100);
        assert!(!ledger.should_update("a.pdf", 100));
        assert!(ledger.should_update("a.pdf", 101));
    }

    #[test]
    fn older_timestamp_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = UpdateLedger::open(dir.path().join("ledger.json"));

        ledger.record("funds.csv", 200);
        assert!(!ledger.should_update("funds.csv", 150));
    }

    #[test]
    fn entries_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let ledger = UpdateLedger::open(path.clone());
            ledger.record("a.pdf", 100);
            ledger.record("b.pdf", 250);
        }

        let reloaded = UpdateLedger::open(path);
        assert_eq!(reloaded.len(), 2);
        assert!(!reloaded.should_update("a.pdf", 100));
        assert!(!reloaded.should_update("b.pdf", 250));
    }

    #[test]
    fn corrupt_ledger_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "][").unwrap();

        let ledger = UpdateLedger::open(path);
        assert!(ledger.is_empty());
        assert!(ledger.should_update("anything", 1));
    }
}
