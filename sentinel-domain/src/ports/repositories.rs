use async_trait::async_trait;
use chrono::NaiveDate;

use crate::entities::{
    AlertCandidate,
    AlertRecord,
    AlertSummaryRow,
    Checkpoint,
    CheckpointUpdate,
    StatusGuard,
    TransactionRecord,
};
use crate::errors::PipelineResult;

/// The append-only transaction dataset.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn count(&self) -> PipelineResult<u64>;
    /// Records with `event_time` strictly after `watermark`, ordered by event
    /// time. `None` returns everything.
    async fn query_new_since(&self, watermark: Option<i64>) -> PipelineResult<Vec<TransactionRecord>>;
    async fn ping(&self) -> PipelineResult<()>;
}

#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn read(&self, process_name: &str) -> PipelineResult<Option<Checkpoint>>;
    /// Insert-if-absent, else update, but only when `guard` admits the stored
    /// row. Returns the row as written, or `Conflict` when the guard fails.
    async fn upsert(
        &self,
        process_name: &str,
        update: &CheckpointUpdate,
        guard: StatusGuard,
    ) -> PipelineResult<Checkpoint>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn max_alert_id(&self) -> PipelineResult<u64>;
    /// Writes candidates not already stored (by fingerprint), allocating IDs
    /// as `max + rank` within the same atomic step. Returns what was written.
    async fn insert_all(
        &self,
        candidates: &[AlertCandidate],
        detected_at: i64,
    ) -> PipelineResult<Vec<AlertRecord>>;
    async fn fetch_alerts(&self, date: NaiveDate, limit: usize) -> PipelineResult<Vec<AlertRecord>>;
    /// Per type/priority counts of alerts created on `date`.
    async fn fetch_summary(&self, date: NaiveDate) -> PipelineResult<Vec<AlertSummaryRow>>;
}
