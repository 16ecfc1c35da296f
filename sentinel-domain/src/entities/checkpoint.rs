// Checkpoint entity
// Durable per-process progress marker; the only state shared between passes

use serde::{Deserialize, Serialize};

use crate::value_objects::{CheckpointStatus, PassReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub process_name: String,
    /// Watermark in epoch milliseconds. `None` means nothing processed yet.
    pub last_processed_timestamp: Option<i64>,
    pub total_records_processed: u64,
    pub alerts_generated: u64,
    pub status: CheckpointStatus,
    /// Run ID of the pass holding PROCESSING; cleared when it finishes.
    pub holder: Option<String>,
    pub last_reason: Option<PassReason>,
    pub last_run_date: Option<String>,
    pub last_duration_ms: u64,
    pub last_error: Option<String>,
    pub updated_at: i64,
    /// Bumped on every write; lets append-only stores pick the newest row.
    pub version: u64,
}

impl Checkpoint {
    pub fn new(process_name: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            last_processed_timestamp: None,
            total_records_processed: 0,
            alerts_generated: 0,
            status: CheckpointStatus::Idle,
            holder: None,
            last_reason: None,
            last_run_date: None,
            last_duration_ms: 0,
            last_error: None,
            updated_at: 0,
            version: 0,
        }
    }

    /// Produces the row that results from applying `update` to `prior`
    /// (or to a fresh row when the process has never run).
    pub fn applied(prior: Option<&Checkpoint>, process_name: &str, update: &CheckpointUpdate) -> Self {
        let mut next = prior
            .cloned()
            .unwrap_or_else(|| Checkpoint::new(process_name));
        next.status = update.status;
        next.holder = update.holder.clone();
        next.last_processed_timestamp = match update.watermark {
            WatermarkChange::Keep => next.last_processed_timestamp,
            WatermarkChange::Advance(ts) => Some(next.last_processed_timestamp.map_or(ts, |cur| cur.max(ts))),
            WatermarkChange::Reset(ts) => ts,
        };
        next.total_records_processed = next
            .total_records_processed
            .saturating_add(update.records_processed);
        if let Some(alerts) = update.alerts_generated {
            next.alerts_generated = alerts;
        }
        if let Some(reason) = update.reason {
            next.last_reason = Some(reason);
        }
        if let Some(date) = &update.run_date {
            next.last_run_date = Some(date.clone());
        }
        if let Some(duration) = update.duration_ms {
            next.last_duration_ms = duration;
        }
        next.last_error = update.error.clone();
        next.updated_at = update.updated_at;
        next.version = next.version.saturating_add(1);
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkChange {
    Keep,
    /// Move forward to this event time; never moves backwards.
    Advance(i64),
    /// Overwrite unconditionally. Only used after a destructive reload.
    Reset(Option<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointUpdate {
    pub status: CheckpointStatus,
    pub holder: Option<String>,
    pub watermark: WatermarkChange,
    pub records_processed: u64,
    pub alerts_generated: Option<u64>,
    pub reason: Option<PassReason>,
    pub run_date: Option<String>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub updated_at: i64,
}

impl CheckpointUpdate {
    pub fn begin(run_id: &str, reason: PassReason, run_date: String, now: i64) -> Self {
        Self {
            status: CheckpointStatus::Processing,
            holder: Some(run_id.to_string()),
            watermark: WatermarkChange::Keep,
            records_processed: 0,
            alerts_generated: None,
            reason: Some(reason),
            run_date: Some(run_date),
            duration_ms: None,
            error: None,
            updated_at: now,
        }
    }

    pub fn complete(
        watermark: WatermarkChange,
        records_processed: u64,
        alerts_generated: u64,
        duration_ms: u64,
        now: i64,
    ) -> Self {
        Self {
            status: CheckpointStatus::Completed,
            holder: None,
            watermark,
            records_processed,
            alerts_generated: Some(alerts_generated),
            reason: None,
            run_date: None,
            duration_ms: Some(duration_ms),
            error: None,
            updated_at: now,
        }
    }

    pub fn fail(error: String, duration_ms: u64, now: i64) -> Self {
        Self {
            status: CheckpointStatus::Failed,
            holder: None,
            watermark: WatermarkChange::Keep,
            records_processed: 0,
            alerts_generated: None,
            reason: None,
            run_date: None,
            duration_ms: Some(duration_ms),
            error: Some(error),
            updated_at: now,
        }
    }
}

/// Precondition a conditional upsert checks against the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusGuard {
    /// Row absent or not PROCESSING. A PROCESSING row last touched before
    /// `stale_before` (epoch ms) is treated as abandoned and also admitted.
    NotProcessing { stale_before: Option<i64> },
    /// Row PROCESSING and held by this run. A run whose hold was reclaimed
    /// can no longer write.
    HeldBy(String),
}

impl StatusGuard {
    pub fn admits(&self, current: Option<&Checkpoint>) -> bool {
        match (self, current) {
            (StatusGuard::NotProcessing { .. }, None) => true,
            (StatusGuard::NotProcessing { stale_before }, Some(row)) => {
                if row.status != CheckpointStatus::Processing {
                    return true;
                }
                stale_before.map_or(false, |cutoff| row.updated_at < cutoff)
            }
            (StatusGuard::HeldBy(_), None) => false,
            (StatusGuard::HeldBy(run_id), Some(row)) => {
                row.status == CheckpointStatus::Processing
                    && row.holder.as_deref() == Some(run_id.as_str())
            }
        }
    }
}
