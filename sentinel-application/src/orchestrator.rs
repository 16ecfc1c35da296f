// Processing orchestrator
// One checkpointed detection pass: acquire, read, detect, persist, release

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use sentinel_domain::{
    max_event_time,
    millis_to_date,
    AlertCandidate,
    AlertRecord,
    AlertRepository,
    Checkpoint,
    CheckpointRepository,
    CheckpointStatus,
    CheckpointUpdate,
    Clock,
    PassOutcome,
    PassReason,
    PassResult,
    PipelineError,
    PipelineResult,
    RecordSource,
    ReplacePolicy,
    RuntimeConfig,
    StatusGuard,
    VelocityDetector,
    WatermarkChange,
    MILLIS_PER_SECOND,
};

use crate::metrics::Metrics;

pub struct PassOrchestrator {
    process_name: String,
    records: Arc<dyn RecordSource>,
    checkpoints: Arc<dyn CheckpointRepository>,
    alerts: Arc<dyn AlertRepository>,
    clock: Arc<dyn Clock>,
    detector: VelocityDetector,
    replace_policy: ReplacePolicy,
    stale_processing_ms: Option<i64>,
    metrics: Arc<Metrics>,
}

impl PassOrchestrator {
    pub fn new(
        config: &RuntimeConfig,
        records: Arc<dyn RecordSource>,
        checkpoints: Arc<dyn CheckpointRepository>,
        alerts: Arc<dyn AlertRepository>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let stale_processing_ms = match config.stale_processing_seconds {
            0 => None,
            secs => Some((secs as i64).saturating_mul(MILLIS_PER_SECOND)),
        };
        Self {
            process_name: config.process_name.clone(),
            records,
            checkpoints,
            alerts,
            clock,
            detector: VelocityDetector::new(config.detection.clone()),
            replace_policy: config.replace_policy,
            stale_processing_ms,
            metrics,
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn detector(&self) -> &VelocityDetector {
        &self.detector
    }

    /// Runs one pass. At most one pass per process name holds the checkpoint;
    /// a second caller gets `AlreadyRunning` and nothing is touched.
    pub async fn run_pass(&self, reason: PassReason) -> PipelineResult<PassResult> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let acquired = match self.acquire(&run_id, reason).await {
            Ok(row) => row,
            Err(err) => {
                if matches!(err, PipelineError::AlreadyRunning { .. }) {
                    self.metrics.record_pass_rejected();
                    warn!(
                        run_id = %run_id,
                        process_name = %self.process_name,
                        reason = reason.as_str(),
                        records = 0u64,
                        alerts = 0u64,
                        duration_ms = elapsed_ms(started),
                        "pass skipped, another pass holds the checkpoint"
                    );
                } else {
                    self.metrics.record_pass_failed();
                    error!(
                        run_id = %run_id,
                        process_name = %self.process_name,
                        "failed to acquire checkpoint: {}",
                        err
                    );
                }
                return Err(err);
            }
        };

        match self.execute(&run_id, reason, &acquired, started).await {
            Ok(result) => {
                self.metrics.record_pass(&result);
                info!(
                    run_id = %run_id,
                    process_name = %self.process_name,
                    reason = reason.as_str(),
                    outcome = ?result.outcome,
                    records = result.records_processed,
                    alerts = result.alerts_generated,
                    duration_ms = result.duration_ms,
                    "pass finished"
                );
                Ok(result)
            }
            Err(err) => {
                let duration_ms = elapsed_ms(started);
                self.metrics.record_pass_failed();
                error!(
                    run_id = %run_id,
                    process_name = %self.process_name,
                    reason = reason.as_str(),
                    kind = err.kind(),
                    duration_ms,
                    "pass failed: {}",
                    err
                );
                self.mark_failed(&run_id, &err, duration_ms).await;
                Err(err)
            }
        }
    }

    async fn acquire(&self, run_id: &str, reason: PassReason) -> PipelineResult<Checkpoint> {
        let now = self.clock.now_millis();
        let stale_before = self.stale_processing_ms.map(|ms| now.saturating_sub(ms));

        if let Ok(Some(prior)) = self.checkpoints.read(&self.process_name).await {
            let guard = StatusGuard::NotProcessing { stale_before };
            if prior.status == CheckpointStatus::Processing && guard.admits(Some(&prior)) {
                warn!(
                    run_id,
                    process_name = %self.process_name,
                    stale_holder = prior.holder.as_deref().unwrap_or("unknown"),
                    "reclaiming checkpoint left PROCESSING since {}",
                    sentinel_domain::format_millis(Some(prior.updated_at))
                );
            }
        }

        let run_date = millis_to_date(now)
            .map(|date| date.to_string())
            .unwrap_or_default();
        let update = CheckpointUpdate::begin(run_id, reason, run_date, now);
        match self
            .checkpoints
            .upsert(&self.process_name, &update, StatusGuard::NotProcessing { stale_before })
            .await
        {
            Ok(row) => {
                info!(
                    run_id,
                    process_name = %self.process_name,
                    reason = reason.as_str(),
                    watermark = %sentinel_domain::format_millis(row.last_processed_timestamp),
                    "pass started"
                );
                Ok(row)
            }
            Err(PipelineError::Conflict(_)) => Err(PipelineError::AlreadyRunning {
                process_name: self.process_name.clone(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        reason: PassReason,
        acquired: &Checkpoint,
        started: Instant,
    ) -> PipelineResult<PassResult> {
        let previous_watermark = acquired.last_processed_timestamp;
        let reprocess = reason == PassReason::Replaced && self.replace_policy == ReplacePolicy::Reprocess;
        let read_from = if reprocess { None } else { previous_watermark };

        let records = self.records.query_new_since(read_from).await?;
        let now = self.clock.now_millis();
        let candidates = self.detector.detect(&records, now)?;
        let written = self.insert_alerts(run_id, &candidates, now).await?;

        let watermark = match (reprocess, max_event_time(&records)) {
            (true, latest) => WatermarkChange::Reset(latest),
            (false, Some(latest)) => WatermarkChange::Advance(latest),
            (false, None) => WatermarkChange::Keep,
        };
        let records_processed = records.len() as u64;
        let alerts_generated = written.len() as u64;
        let duration_ms = elapsed_ms(started);

        let update = CheckpointUpdate::complete(
            watermark,
            records_processed,
            alerts_generated,
            duration_ms,
            self.clock.now_millis(),
        );
        let completed = self
            .checkpoints
            .upsert(
                &self.process_name,
                &update,
                StatusGuard::HeldBy(run_id.to_string()),
            )
            .await?;

        Ok(PassResult {
            run_id: run_id.to_string(),
            process_name: self.process_name.clone(),
            reason,
            outcome: if records.is_empty() {
                PassOutcome::NoOp
            } else {
                PassOutcome::Completed
            },
            records_processed,
            alerts_generated,
            first_alert_id: written.first().map(|alert| alert.alert_id),
            previous_watermark,
            new_watermark: completed.last_processed_timestamp,
            duration_ms,
        })
    }

    /// Conflicts on the alert store are retried once; dedup by fingerprint
    /// keeps the retry from writing anything twice.
    async fn insert_alerts(
        &self,
        run_id: &str,
        candidates: &[AlertCandidate],
        detected_at: i64,
    ) -> PipelineResult<Vec<AlertRecord>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        match self.alerts.insert_all(candidates, detected_at).await {
            Err(PipelineError::Conflict(reason)) => {
                warn!(run_id, "alert insert conflicted, retrying once: {}", reason);
                self.alerts.insert_all(candidates, detected_at).await
            }
            other => other,
        }
    }

    async fn mark_failed(&self, run_id: &str, err: &PipelineError, duration_ms: u64) {
        let update = CheckpointUpdate::fail(err.to_string(), duration_ms, self.clock.now_millis());
        if let Err(write_err) = self
            .checkpoints
            .upsert(
                &self.process_name,
                &update,
                StatusGuard::HeldBy(run_id.to_string()),
            )
            .await
        {
            warn!(
                run_id,
                process_name = %self.process_name,
                "could not record failed status: {}",
                write_err
            );
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
