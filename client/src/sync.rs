//! Background sync between the local database and the sync server.
//!
//! A cycle pushes every local transaction and audit row written since
//! the last completed cycle, then pulls the server's full document sets
//! and merges them in by id. A failed push aborts the cycle with the
//! watermark untouched, so the same rows go out again next time. A
//! failed merge of pulled documents is logged and skipped so one bad
//! batch cannot wedge the loop.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use baler_engine::{Database, Timestamp};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::transport::SyncTransport;

/// How often the background loop attempts a cycle.
pub const SYNC_PERIOD: Duration = Duration::from_secs(30);

/// Observable state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Offline,
}

/// What a requested cycle did.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The cycle ran to completion and the watermark advanced.
    Completed(SyncReport),
    /// The cycle aborted; the watermark is unchanged.
    Failed(SyncError),
    /// The host reports no connectivity; nothing was attempted.
    SkippedOffline,
    /// Another cycle was already running.
    SkippedBusy,
}

/// Document counts moved by a completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed_transactions: usize,
    pub pushed_audits: usize,
    pub pulled_transactions: usize,
    pub pulled_audits: usize,
}

/// Drives periodic push/pull cycles over a [`SyncTransport`].
pub struct SyncEngine {
    db: Arc<Database>,
    transport: Arc<dyn SyncTransport>,
    /// Millis timestamp of the last completed cycle; rows newer than
    /// this are pushed next cycle. Not durable: a fresh process
    /// re-pushes history, which the server's id merge absorbs.
    watermark: AtomicI64,
    online: AtomicBool,
    cycle_lock: Mutex<()>,
    last_sync: Mutex<Option<String>>,
    shutdown: Notify,
}

impl SyncEngine {
    pub fn new(db: Arc<Database>, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            db,
            transport,
            watermark: AtomicI64::new(0),
            online: AtomicBool::new(true),
            cycle_lock: Mutex::new(()),
            last_sync: Mutex::new(None),
            shutdown: Notify::new(),
        }
    }

    /// Record whether the host currently has connectivity. Offline
    /// engines skip cycles instead of timing out against the network.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SyncStatus {
        if !self.online.load(Ordering::SeqCst) {
            return SyncStatus::Offline;
        }
        if self.cycle_lock.try_lock().is_ok() {
            SyncStatus::Idle
        } else {
            SyncStatus::Syncing
        }
    }

    /// Watermark of the last completed cycle, zero before the first.
    pub fn watermark(&self) -> Timestamp {
        self.watermark.load(Ordering::SeqCst)
    }

    /// Wall-clock stamp of the last completed cycle, for display.
    pub async fn last_sync(&self) -> Option<String> {
        self.last_sync.lock().await.clone()
    }

    /// Run one cycle at the current wall-clock time.
    pub async fn sync_now(&self) -> SyncOutcome {
        self.sync_at(Utc::now().timestamp_millis()).await
    }

    /// Run one cycle, stamping the watermark with `now` on completion.
    pub async fn sync_at(&self, now: Timestamp) -> SyncOutcome {
        if !self.online.load(Ordering::SeqCst) {
            debug!("sync skipped: offline");
            return SyncOutcome::SkippedOffline;
        }
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("sync skipped: cycle already running");
            return SyncOutcome::SkippedBusy;
        };

        info!("starting sync cycle");
        match self.run_cycle(now).await {
            Ok(report) => {
                info!(?report, "sync completed");
                SyncOutcome::Completed(report)
            }
            Err(err) => {
                warn!(error = %err, "sync failed");
                SyncOutcome::Failed(err)
            }
        }
    }

    async fn run_cycle(&self, now: Timestamp) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let since = self.watermark.load(Ordering::SeqCst);

        let local_tx = self.db.transactions_since(since);
        if !local_tx.is_empty() {
            debug!(count = local_tx.len(), "pushing local transactions");
            self.transport.push_transactions(&local_tx).await?;
            report.pushed_transactions = local_tx.len();
        }

        let local_audits = self.db.audits_since(since);
        if !local_audits.is_empty() {
            debug!(count = local_audits.len(), "pushing local audits");
            self.transport.push_audits(&local_audits).await?;
            report.pushed_audits = local_audits.len();
        }

        let pulled = self.transport.pull_transactions().await?;
        if !pulled.documents.is_empty() {
            debug!(count = pulled.documents.len(), "pulling remote transactions");
            report.pulled_transactions = pulled.documents.len();
            if let Err(err) = self.db.transactions.bulk_upsert(pulled.documents) {
                warn!(error = %err, "transaction upsert failed");
            }
        }

        let pulled = self.transport.pull_audits().await?;
        if !pulled.documents.is_empty() {
            debug!(count = pulled.documents.len(), "pulling remote audits");
            report.pulled_audits = pulled.documents.len();
            if let Err(err) = self.db.audit_logs.bulk_upsert(pulled.documents) {
                warn!(error = %err, "audit upsert failed");
            }
        }

        self.watermark.store(now, Ordering::SeqCst);
        if let Some(stamp) = DateTime::from_timestamp_millis(now) {
            *self.last_sync.lock().await = Some(stamp.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        Ok(report)
    }

    /// Start the periodic loop. The first cycle lands one period out,
    /// later ones every [`SYNC_PERIOD`] until [`stop`](Self::stop).
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(SYNC_PERIOD);
            // The immediate first tick; the next one is a period away.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sync_now().await;
                    }
                    _ = self.shutdown.notified() => {
                        debug!("sync loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop a running loop after its current cycle.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::SyncTransport;

    use async_trait::async_trait;
    use baler_engine::{
        merge_by_id, AuditLog, BlobStore, MemoryStore, NewTransaction, PullResponse, PushAck,
        Transaction,
    };

    const NOW: i64 = 1_700_000_000_000;

    /// In-memory stand-in for the server, with push failure injection.
    #[derive(Default)]
    struct MemTransport {
        remote_tx: Mutex<Vec<Transaction>>,
        remote_audits: Mutex<Vec<AuditLog>>,
        fail_pushes: AtomicBool,
        calls: AtomicI64,
    }

    impl MemTransport {
        fn fail_pushes(&self, fail: bool) {
            self.fail_pushes.store(fail, Ordering::SeqCst);
        }

        async fn seed_remote_tx(&self, docs: Vec<Transaction>) {
            *self.remote_tx.lock().await = docs;
        }
    }

    #[async_trait]
    impl SyncTransport for MemTransport {
        async fn pull_transactions(&self) -> Result<PullResponse<Transaction>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PullResponse {
                documents: self.remote_tx.lock().await.clone(),
                last_pulled_rev: NOW,
            })
        }

        async fn push_transactions(
            &self,
            documents: &[Transaction],
        ) -> Result<PushAck, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_pushes.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    endpoint: "/api/sync/push".to_string(),
                    status: 500,
                });
            }
            merge_by_id(&mut *self.remote_tx.lock().await, documents.to_vec());
            Ok(PushAck {
                success: true,
                message: "Push received".to_string(),
            })
        }

        async fn pull_audits(&self) -> Result<PullResponse<AuditLog>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PullResponse {
                documents: self.remote_audits.lock().await.clone(),
                last_pulled_rev: NOW,
            })
        }

        async fn push_audits(&self, documents: &[AuditLog]) -> Result<PushAck, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_pushes.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    endpoint: "/api/sync/audits".to_string(),
                    status: 500,
                });
            }
            merge_by_id(&mut *self.remote_audits.lock().await, documents.to_vec());
            Ok(PushAck {
                success: true,
                message: "Audit push received".to_string(),
            })
        }
    }

    fn remote_transaction(id: &str, timestamp: i64) -> Transaction {
        Transaction {
            id: id.into(),
            material_id: "lead".into(),
            material_name: "Lead".into(),
            weight: 2.0,
            price_per_kg: 20.0,
            total: 40.0,
            supplier_id: "SUP-REMOTE".into(),
            timestamp,
            signature_data: None,
            deleted: false,
        }
    }

    fn purchase(material: &str, weight: f64) -> NewTransaction {
        NewTransaction {
            material_id: material.into(),
            weight,
            supplier_id: "SUP-001".into(),
            signature_data: None,
        }
    }

    fn open_engine() -> (Arc<Database>, Arc<MemTransport>, SyncEngine) {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new()), NOW).unwrap());
        let transport = Arc::new(MemTransport::default());
        let engine = SyncEngine::new(db.clone(), transport.clone());
        (db, transport, engine)
    }

    #[tokio::test]
    async fn first_cycle_pushes_history_and_pulls_remote() {
        let (db, transport, engine) = open_engine();
        db.record_purchase(purchase("copper-bright", 10.0), NOW + 1_000)
            .unwrap();
        transport
            .seed_remote_tx(vec![remote_transaction("tx-remote", NOW - 50)])
            .await;

        let outcome = engine.sync_at(NOW + 2_000).await;
        let SyncOutcome::Completed(report) = outcome else {
            panic!("expected completed cycle, got {outcome:?}");
        };

        assert_eq!(report.pushed_transactions, 1);
        // Seeded audit rows plus the purchase audit all sit past
        // watermark zero.
        assert_eq!(report.pushed_audits, 4);
        assert_eq!(report.pulled_transactions, 2);

        // The remote row landed locally, the local row landed remotely.
        assert!(db.transactions.find_one("tx-remote").is_some());
        assert_eq!(transport.remote_tx.lock().await.len(), 2);
        assert_eq!(engine.watermark(), NOW + 2_000);
    }

    #[tokio::test]
    async fn failed_push_keeps_watermark_for_resend() {
        let (db, transport, engine) = open_engine();
        db.record_purchase(purchase("brass", 4.0), NOW + 1_000).unwrap();

        transport.fail_pushes(true);
        let outcome = engine.sync_at(NOW + 2_000).await;
        assert!(matches!(outcome, SyncOutcome::Failed(_)));
        assert_eq!(engine.watermark(), 0);
        assert!(transport.remote_tx.lock().await.is_empty());
        assert!(engine.last_sync().await.is_none());

        // The next cycle re-sends the same rows.
        transport.fail_pushes(false);
        let outcome = engine.sync_at(NOW + 3_000).await;
        let SyncOutcome::Completed(report) = outcome else {
            panic!("expected completed cycle, got {outcome:?}");
        };
        assert_eq!(report.pushed_transactions, 1);
        assert_eq!(transport.remote_tx.lock().await.len(), 1);
        assert_eq!(engine.watermark(), NOW + 3_000);
    }

    #[tokio::test]
    async fn watermark_limits_next_push_to_new_rows() {
        let (db, transport, engine) = open_engine();
        db.record_purchase(purchase("copper-bright", 1.0), NOW + 1_000)
            .unwrap();
        assert!(matches!(
            engine.sync_at(NOW + 2_000).await,
            SyncOutcome::Completed(_)
        ));

        db.record_purchase(purchase("brass", 2.0), NOW + 3_000).unwrap();
        let SyncOutcome::Completed(report) = engine.sync_at(NOW + 4_000).await else {
            panic!("expected completed cycle");
        };

        assert_eq!(report.pushed_transactions, 1);
        assert_eq!(report.pushed_audits, 1);
        assert_eq!(transport.remote_tx.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn offline_engine_skips_without_touching_transport() {
        let (_, transport, engine) = open_engine();
        engine.set_online(false);
        assert_eq!(engine.status(), SyncStatus::Offline);

        let outcome = engine.sync_at(NOW).await;
        assert!(matches!(outcome, SyncOutcome::SkippedOffline));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.watermark(), 0);

        engine.set_online(true);
        assert_eq!(engine.status(), SyncStatus::Idle);
        assert!(matches!(engine.sync_at(NOW).await, SyncOutcome::Completed(_)));
    }

    /// Transport that parks pulls until released, to hold a cycle open.
    #[derive(Default)]
    struct ParkedTransport {
        gate: Notify,
    }

    #[async_trait]
    impl SyncTransport for ParkedTransport {
        async fn pull_transactions(&self) -> Result<PullResponse<Transaction>, TransportError> {
            self.gate.notified().await;
            Ok(PullResponse {
                documents: Vec::new(),
                last_pulled_rev: NOW,
            })
        }

        async fn push_transactions(
            &self,
            _documents: &[Transaction],
        ) -> Result<PushAck, TransportError> {
            Ok(PushAck {
                success: true,
                message: "Push received".to_string(),
            })
        }

        async fn pull_audits(&self) -> Result<PullResponse<AuditLog>, TransportError> {
            Ok(PullResponse {
                documents: Vec::new(),
                last_pulled_rev: NOW,
            })
        }

        async fn push_audits(&self, _documents: &[AuditLog]) -> Result<PushAck, TransportError> {
            Ok(PushAck {
                success: true,
                message: "Audit push received".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn overlapping_cycle_is_skipped_as_busy() {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new()), NOW).unwrap());
        let transport = Arc::new(ParkedTransport::default());
        let engine = Arc::new(SyncEngine::new(db, transport.clone()));

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync_at(NOW + 1_000).await })
        };
        // Let the first cycle reach the parked pull.
        tokio::task::yield_now().await;
        while engine.status() != SyncStatus::Syncing {
            tokio::task::yield_now().await;
        }

        assert!(matches!(engine.sync_at(NOW + 2_000).await, SyncOutcome::SkippedBusy));

        transport.gate.notify_one();
        let outcome = running.await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(engine.status(), SyncStatus::Idle);
    }

    /// Store whose writes can be switched off, to fail upserts.
    struct FlakyStore {
        inner: MemoryStore,
        fail_puts: AtomicBool,
    }

    impl BlobStore for FlakyStore {
        fn get(&self, key: &str) -> baler_engine::Result<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> baler_engine::Result<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(baler_engine::Error::Storage("disk full".to_string()));
            }
            self.inner.put(key, value)
        }
    }

    #[tokio::test]
    async fn failed_pull_merge_does_not_abort_the_cycle() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_puts: AtomicBool::new(false),
        });
        let db = Arc::new(Database::open(store.clone(), NOW).unwrap());
        let transport = Arc::new(MemTransport::default());
        transport
            .seed_remote_tx(vec![remote_transaction("tx-remote", NOW - 50)])
            .await;
        let engine = SyncEngine::new(db.clone(), transport.clone());

        store.fail_puts.store(true, Ordering::SeqCst);
        let SyncOutcome::Completed(report) = engine.sync_at(NOW + 1_000).await else {
            panic!("expected completed cycle");
        };

        // The pull was received but could not be stored; the cycle
        // still completed and stamped.
        assert_eq!(report.pulled_transactions, 1);
        assert_eq!(engine.watermark(), NOW + 1_000);
        assert!(engine.last_sync().await.is_some());
    }

    #[tokio::test]
    async fn last_sync_is_a_wall_clock_stamp() {
        let (_, _, engine) = open_engine();
        assert!(matches!(
            engine.sync_at(1_700_000_000_000).await,
            SyncOutcome::Completed(_)
        ));
        assert_eq!(
            engine.last_sync().await.as_deref(),
            Some("2023-11-14 22:13:20")
        );
    }
}
