// ⚖️ Reconciliation Engine - merge a remote batch into the local store
//
// Identity is the quote id. For every remote quote, in the order received:
//   - id already present locally → overwrite text/category (a conflict)
//   - id unknown                 → append with the remote id (a merge)
//
// The remote value always wins. There is no timestamp or version comparison.
// The store is persisted once after the whole batch.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::quote::Quote;
use crate::store::QuoteStore;

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Remote quotes appended because their id was unknown locally
    pub merged: usize,

    /// Remote quotes that overwrote a local quote with the same id
    pub conflicts: usize,

    /// Whether the post-batch save reached the gateway
    pub persisted: bool,

    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn batch_size(&self) -> usize {
        self.merged + self.conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts > 0
    }

    /// User-facing notice, only when something was overwritten.
    pub fn notice(&self) -> Option<String> {
        self.has_conflicts().then(|| {
            format!(
                "⚠ {} conflict(s) resolved with server data.",
                self.conflicts
            )
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciled {} remote quotes: {} merged, {} conflicts{}",
            self.batch_size(),
            self.merged,
            self.conflicts,
            if self.persisted { "" } else { " (not persisted)" }
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Merge `batch` into `store`, remote wins on id collision.
    ///
    /// Not atomic: if the final save fails, the in-memory merge stands.
    pub fn reconcile(&self, store: &mut QuoteStore, batch: &[Quote]) -> ReconciliationReport {
        let mut merged = 0;
        let mut conflicts = 0;

        for remote in batch {
            if store.find_by_id(remote.id).is_some() {
                store.apply_replace(remote.id, &remote.text, &remote.category);
                conflicts += 1;
                continue;
            }

            match store.apply_insert(remote.clone()) {
                Ok(()) => merged += 1,
                // Ruled out by the lookup above
                Err(e) => warn!("Skipping remote quote {}: {}", remote.id, e),
            }
        }

        let persisted = store.persist();
        debug!(
            "Reconciliation applied: {} merged, {} conflicts",
            merged, conflicts
        );

        ReconciliationReport {
            merged,
            conflicts,
            persisted,
            reconciled_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryGateway, PersistenceGateway};

    fn store_from(quotes: Vec<Quote>) -> (QuoteStore, MemoryGateway) {
        let gateway = MemoryGateway::with_quotes(&quotes);
        let store = QuoteStore::initialize(Box::new(gateway.clone()));
        (store, gateway)
    }

    #[test]
    fn test_reconcile_conflict_and_merge() {
        let (mut store, _) = store_from(vec![Quote::new(1, "A", "X")]);
        let batch = vec![Quote::new(1, "A2", "Y"), Quote::new(2, "B", "Z")];

        let report = ReconciliationEngine::new().reconcile(&mut store, &batch);

        assert_eq!(report.merged, 1);
        assert_eq!(report.conflicts, 1);
        assert_eq!(store.list(), batch.as_slice());

        println!("✅ Test passed: {}", report.summary());
    }

    #[test]
    fn test_reconcile_empty_batch_is_valid() {
        let (mut store, _) = store_from(vec![Quote::new(1, "A", "X")]);

        let report = ReconciliationEngine::new().reconcile(&mut store, &[]);

        assert_eq!(report.batch_size(), 0);
        assert!(report.notice().is_none());
        assert_eq!(store.list(), &[Quote::new(1, "A", "X")]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (mut store, _) = store_from(vec![
            Quote::new(1, "A", "X"),
            Quote::new(3, "C", "X"),
        ]);
        let batch = vec![
            Quote::new(3, "C-remote", "Server"),
            Quote::new(4, "D", "Server"),
            Quote::new(5, "E", "Server"),
        ];
        let engine = ReconciliationEngine::new();

        let first = engine.reconcile(&mut store, &batch);
        let after_first = store.list().to_vec();
        let second = engine.reconcile(&mut store, &batch);

        assert_eq!((first.merged, first.conflicts), (2, 1));
        assert_eq!((second.merged, second.conflicts), (0, batch.len()));
        assert_eq!(store.list(), after_first.as_slice());
    }

    #[test]
    fn test_reconcile_persists_once_per_batch() {
        let (mut store, gateway) = store_from(vec![Quote::new(1, "A", "X")]);
        let saves_before = gateway.save_count();
        let batch: Vec<Quote> = (1..=10)
            .map(|id| Quote::new(id, format!("post {}", id), "Server"))
            .collect();

        let report = ReconciliationEngine::new().reconcile(&mut store, &batch);

        assert!(report.persisted);
        assert_eq!(gateway.save_count(), saves_before + 1);
        assert_eq!(gateway.load().as_deref(), Some(store.list()));
    }

    #[test]
    fn test_reconcile_keeps_changes_when_persistence_fails() {
        let (mut store, gateway) = store_from(vec![Quote::new(1, "A", "X")]);
        gateway.fail_saves(true);

        let report = ReconciliationEngine::new()
            .reconcile(&mut store, &[Quote::new(1, "A2", "Y"), Quote::new(9, "N", "Z")]);

        assert!(!report.persisted);
        assert_eq!(store.len(), 2, "No rollback of the in-memory merge");
        assert_eq!(store.find_by_id(1).map(|q| q.text.as_str()), Some("A2"));
        assert!(report.summary().ends_with("(not persisted)"));
    }

    #[test]
    fn test_reconcile_duplicate_ids_inside_batch() {
        let (mut store, _) = store_from(Vec::new());
        let batch = vec![Quote::new(8, "first", "S"), Quote::new(8, "second", "S")];

        let report = ReconciliationEngine::new().reconcile(&mut store, &batch);

        // Second occurrence finds the first and overwrites it
        assert_eq!((report.merged, report.conflicts), (1, 1));
        assert_eq!(store.list(), &[Quote::new(8, "second", "S")]);
    }

    #[test]
    fn test_notice_text() {
        let (mut store, _) = store_from(vec![Quote::new(1, "A", "X"), Quote::new(2, "B", "X")]);

        let report = ReconciliationEngine::new()
            .reconcile(&mut store, &[Quote::new(1, "a", "X"), Quote::new(2, "b", "X")]);

        assert_eq!(
            report.notice().as_deref(),
            Some("⚠ 2 conflict(s) resolved with server data.")
        );
    }
}
