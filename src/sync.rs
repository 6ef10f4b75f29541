//! Background synchronization with the remote source.
//!
//! A tick fetches one batch, reconciles it into the shared store and
//! persists. Ticks never overlap: a tick requested while another is still
//! waiting on the remote is skipped, not queued. Newly added quotes are
//! pushed in spawned tasks whose failures are only logged.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::errors::{RemoteError, ValidationError};
use crate::quote::Quote;
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::remote::RemoteSource;
use crate::store::QuoteStore;

/// Store handle shared between the scheduler and its callers.
pub type SharedStore = Arc<Mutex<QuoteStore>>;

pub fn shared(store: QuoteStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock the store, recovering it if a previous holder panicked.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, QuoteStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(ReconciliationReport),
    /// Another tick was still in flight
    Skipped,
    Failed(RemoteError),
}

impl TickOutcome {
    pub fn report(&self) -> Option<&ReconciliationReport> {
        match self {
            TickOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Clears the in-flight flag when the tick ends, however it ends.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct SyncScheduler {
    store: SharedStore,
    remote: Arc<dyn RemoteSource>,
    engine: ReconciliationEngine,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    last_report: Arc<Mutex<Option<ReconciliationReport>>>,
}

impl SyncScheduler {
    pub fn new(store: SharedStore, remote: Arc<dyn RemoteSource>, interval: Duration) -> Self {
        Self {
            store,
            remote,
            engine: ReconciliationEngine::new(),
            interval,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Report of the most recent completed tick, from any clone of this scheduler.
    pub fn last_report(&self) -> Option<ReconciliationReport> {
        self.last_report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// One reconciliation pass: fetch, merge, persist.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Sync tick skipped: previous tick still in flight");
            return TickOutcome::Skipped;
        };

        let batch = match self.remote.fetch_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Sync failed, retrying next tick: {}", e);
                return TickOutcome::Failed(e);
            }
        };

        let report = {
            let mut store = lock_store(&self.store);
            self.engine.reconcile(&mut store, &batch)
        };

        info!("{}", report.summary());
        if let Some(notice) = report.notice() {
            info!("{}", notice);
        }
        *self
            .last_report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(report.clone());

        TickOutcome::Completed(report)
    }

    /// Tick forever on the configured interval. The first tick fires immediately.
    pub async fn run(self) {
        info!("Quote sync scheduler started ({}s interval)", self.interval.as_secs());

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Add locally and push the new quote to the remote in the background.
    pub fn add_quote(&self, text: &str, category: &str) -> Result<Quote, ValidationError> {
        let quote = lock_store(&self.store).add(text, category)?;
        self.push_in_background(quote.clone());
        Ok(quote)
    }

    pub fn push_in_background(&self, quote: Quote) -> JoinHandle<()> {
        let remote = self.remote.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.push_one(&quote).await {
                warn!("Error posting quote {} to server: {}", quote.id, e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryGateway;
    use async_trait::async_trait;
    use tokio::sync::{oneshot, Notify};
    use tokio::time::timeout;

    #[derive(Default)]
    struct ScriptedRemote {
        batch: Vec<Quote>,
        fail_fetch: bool,
        fail_push: bool,
        pushed: Mutex<Vec<Quote>>,
        push_attempted: Notify,
        fetch_started: Notify,
        // Held by the first fetch only; later fetches run straight through
        fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl ScriptedRemote {
        fn gated(batch: Vec<Quote>) -> (Self, oneshot::Sender<()>) {
            let (release, gate) = oneshot::channel();
            let remote = Self {
                batch,
                fetch_gate: Mutex::new(Some(gate)),
                ..Default::default()
            };
            (remote, release)
        }

        async fn wait_for_push(&self) {
            timeout(Duration::from_secs(2), self.push_attempted.notified())
                .await
                .expect("add_quote should start a push");
        }
    }

    #[async_trait]
    impl RemoteSource for ScriptedRemote {
        async fn fetch_batch(&self) -> Result<Vec<Quote>, RemoteError> {
            self.fetch_started.notify_one();
            let gate = self.fetch_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.fail_fetch {
                return Err(RemoteError::status(503, "unavailable"));
            }
            Ok(self.batch.clone())
        }

        async fn push_one(&self, quote: &Quote) -> Result<(), RemoteError> {
            let result = if self.fail_push {
                Err(RemoteError::status(500, "boom"))
            } else {
                self.pushed.lock().unwrap().push(quote.clone());
                Ok(())
            };
            self.push_attempted.notify_one();
            result
        }
    }

    fn scheduler_with(remote: Arc<ScriptedRemote>) -> SyncScheduler {
        let store = shared(QuoteStore::initialize(Box::new(MemoryGateway::new())));
        SyncScheduler::new(store, remote, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_tick_reconciles_remote_batch() {
        let remote = Arc::new(ScriptedRemote {
            batch: vec![
                Quote::new(1, "Overwritten", "Server"),
                Quote::new(11, "New", "Server"),
            ],
            ..Default::default()
        });
        let scheduler = scheduler_with(remote);

        let outcome = scheduler.tick().await;

        let report = outcome.report().expect("tick should complete");
        assert_eq!((report.merged, report.conflicts), (1, 1));

        let store = lock_store(scheduler.store());
        assert_eq!(store.len(), 5);
        assert_eq!(store.find_by_id(1).map(|q| q.text.as_str()), Some("Overwritten"));
        assert!(!scheduler.is_in_flight());
        assert_eq!(scheduler.last_report().as_ref(), Some(report));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_store_untouched() {
        let remote = Arc::new(ScriptedRemote {
            batch: vec![Quote::new(99, "never", "Server")],
            fail_fetch: true,
            ..Default::default()
        });
        let scheduler = scheduler_with(remote);

        let outcome = scheduler.tick().await;

        assert!(matches!(outcome, TickOutcome::Failed(RemoteError::Status { status: 503, .. })));
        assert_eq!(lock_store(scheduler.store()).len(), 4);
        assert!(!scheduler.is_in_flight(), "Flag cleared after failure");
        assert!(scheduler.last_report().is_none());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let (remote, release) = ScriptedRemote::gated(vec![Quote::new(20, "late", "Server")]);
        let remote = Arc::new(remote);
        let scheduler = scheduler_with(remote.clone());

        let first = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.tick().await }
        });
        remote.fetch_started.notified().await;

        assert!(scheduler.is_in_flight());
        assert!(matches!(scheduler.tick().await, TickOutcome::Skipped));

        release.send(()).unwrap();
        let outcome = timeout(Duration::from_secs(2), first)
            .await
            .expect("released tick finishes")
            .unwrap();

        assert_eq!(outcome.report().map(|r| r.merged), Some(1));
        assert!(!scheduler.is_in_flight());

        let next = timeout(Duration::from_secs(2), scheduler.tick())
            .await
            .expect("ungated tick finishes");
        assert_eq!(
            next.report().map(|r| (r.merged, r.conflicts)),
            Some((0, 1)),
            "Next tick runs normally"
        );
    }

    #[tokio::test]
    async fn test_add_quote_pushes_in_background() {
        let remote = Arc::new(ScriptedRemote::default());
        let scheduler = scheduler_with(remote.clone());

        let quote = scheduler.add_quote("Pushed", "Outbox").unwrap();
        remote.wait_for_push().await;

        assert_eq!(*remote.pushed.lock().unwrap(), vec![quote.clone()]);
        assert_eq!(lock_store(scheduler.store()).find_by_id(5), Some(&quote));
    }

    #[tokio::test]
    async fn test_add_quote_validation_skips_push() {
        let remote = Arc::new(ScriptedRemote::default());
        let scheduler = scheduler_with(remote.clone());

        assert!(scheduler.add_quote("", "Outbox").is_err());
        let waited = timeout(Duration::from_millis(50), remote.push_attempted.notified()).await;

        assert!(waited.is_err(), "No push for rejected input");
        assert!(remote.pushed.lock().unwrap().is_empty());
        assert_eq!(lock_store(scheduler.store()).len(), 4);
    }

    #[tokio::test]
    async fn test_push_failure_does_not_affect_store() {
        let remote = Arc::new(ScriptedRemote {
            fail_push: true,
            ..Default::default()
        });
        let scheduler = scheduler_with(remote.clone());

        let quote = scheduler.add_quote("Kept locally", "Offline").unwrap();
        remote.wait_for_push().await;

        assert!(remote.pushed.lock().unwrap().is_empty());
        assert_eq!(lock_store(scheduler.store()).find_by_id(quote.id), Some(&quote));
    }
}
