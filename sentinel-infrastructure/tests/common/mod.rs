#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use sentinel_application::AppState;
use sentinel_domain::{
    Checkpoint,
    CheckpointRepository,
    CheckpointStatus,
    CheckpointUpdate,
    Clock,
    PipelineError,
    PipelineResult,
    RecordSource,
    RuntimeConfig,
    StatusGuard,
    TransactionRecord,
    MILLIS_PER_HOUR,
    MILLIS_PER_MINUTE,
};
use sentinel_infrastructure::{DefaultHealthService, MemoryRepo};

/// 2024-03-01T10:00:00Z
pub const BASE: i64 = 1_709_287_200_000;

pub fn tx(entity: &str, seq: usize, offset_minutes: i64, amount: f64) -> TransactionRecord {
    TransactionRecord {
        transaction_id: format!("{}-{}", entity, seq),
        entity_key: entity.to_string(),
        event_time: BASE + offset_minutes * MILLIS_PER_MINUTE,
        amount,
        merchant: "fraud_Kirlin and Sons".to_string(),
        category: "shopping_net".to_string(),
        latitude: 36.08,
        longitude: -81.17,
        merchant_latitude: 36.01,
        merchant_longitude: -82.04,
    }
}

/// One transaction per offset for `entity`, each for `amount`.
pub fn burst(entity: &str, offsets: &[i64], amount: f64) -> Vec<TransactionRecord> {
    offsets
        .iter()
        .enumerate()
        .map(|(seq, offset)| tx(entity, seq, *offset, amount))
        .collect()
}

pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(now),
        })
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn default_now() -> i64 {
    BASE + MILLIS_PER_HOUR
}

/// Record source over a `MemoryRepo` that can fail or block on demand.
pub struct FlakySource {
    inner: Arc<MemoryRepo>,
    fail_queries: AtomicUsize,
    fail_counts: AtomicBool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FlakySource {
    pub fn new(inner: Arc<MemoryRepo>) -> Self {
        Self {
            inner,
            fail_queries: AtomicUsize::new(0),
            fail_counts: AtomicBool::new(false),
            gate: None,
        }
    }

    /// `query_new_since` signals `entered`, then waits for `release`.
    pub fn gated(inner: Arc<MemoryRepo>, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::new(inner)
        }
    }

    pub fn fail_next_queries(&self, times: usize) {
        self.fail_queries.store(times, Ordering::SeqCst);
    }

    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordSource for FlakySource {
    async fn count(&self) -> PipelineResult<u64> {
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(PipelineError::SourceUnavailable("count timed out".to_string()));
        }
        self.inner.count().await
    }

    async fn query_new_since(&self, watermark: Option<i64>) -> PipelineResult<Vec<TransactionRecord>> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        let remaining = self.fail_queries.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_queries.store(remaining - 1, Ordering::SeqCst);
            return Err(PipelineError::SourceUnavailable("query timed out".to_string()));
        }
        self.inner.query_new_since(watermark).await
    }

    async fn ping(&self) -> PipelineResult<()> {
        self.inner.ping().await
    }
}

/// Checkpoint store over a `MemoryRepo` that can drop a completion write or
/// refuse reads.
pub struct FlakyCheckpoints {
    inner: Arc<MemoryRepo>,
    fail_next_completion: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyCheckpoints {
    pub fn new(inner: Arc<MemoryRepo>) -> Self {
        Self {
            inner,
            fail_next_completion: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_next_completion(&self) {
        self.fail_next_completion.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckpointRepository for FlakyCheckpoints {
    async fn read(&self, process_name: &str) -> PipelineResult<Option<Checkpoint>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PipelineError::SourceUnavailable("metadata table missing".to_string()));
        }
        self.inner.read(process_name).await
    }

    async fn upsert(
        &self,
        process_name: &str,
        update: &CheckpointUpdate,
        guard: StatusGuard,
    ) -> PipelineResult<Checkpoint> {
        if update.status == CheckpointStatus::Completed
            && self.fail_next_completion.swap(false, Ordering::SeqCst)
        {
            return Err(PipelineError::SourceUnavailable("connection reset".to_string()));
        }
        self.inner.upsert(process_name, update, guard).await
    }
}

pub fn state_with(
    config: RuntimeConfig,
    repo: &Arc<MemoryRepo>,
    source: Arc<dyn RecordSource>,
    checkpoints: Arc<dyn CheckpointRepository>,
    clock: Arc<FixedClock>,
) -> AppState {
    AppState::new(
        config,
        source.clone(),
        checkpoints,
        repo.clone(),
        Arc::new(DefaultHealthService::new(source)),
        clock,
    )
}

/// Everything backed by one `MemoryRepo`.
pub fn memory_state(config: RuntimeConfig) -> (Arc<MemoryRepo>, Arc<FixedClock>, AppState) {
    let repo = Arc::new(MemoryRepo::new());
    let clock = FixedClock::at(default_now());
    let state = state_with(config, &repo, repo.clone(), repo.clone(), clock.clone());
    (repo, clock, state)
}
