// Change monitor
// Polls the dataset row count and triggers a pass on growth or replacement

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use sentinel_domain::{
    millis_to_date,
    AlertRepository,
    ChangeKind,
    CheckpointRepository,
    Clock,
    Observation,
    PipelineError,
    PipelineResult,
    RecordSource,
    TriggerAction,
    TriggerDecision,
};

use crate::dtos::AlertSummary;
use crate::metrics::Metrics;
use crate::orchestrator::PassOrchestrator;
use crate::queries::alert_queries;

pub struct ChangeMonitor {
    records: Arc<dyn RecordSource>,
    checkpoints: Arc<dyn CheckpointRepository>,
    alerts: Arc<dyn AlertRepository>,
    orchestrator: Arc<PassOrchestrator>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    interval: Duration,
    summary_every_ticks: u64,
    last_known: Option<Observation>,
    ticks: u64,
}

impl ChangeMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        records: Arc<dyn RecordSource>,
        checkpoints: Arc<dyn CheckpointRepository>,
        alerts: Arc<dyn AlertRepository>,
        orchestrator: Arc<PassOrchestrator>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        interval: Duration,
        summary_every_ticks: u64,
    ) -> Self {
        Self {
            records,
            checkpoints,
            alerts,
            orchestrator,
            clock,
            metrics,
            interval,
            summary_every_ticks,
            last_known: None,
            ticks: 0,
        }
    }

    /// Last observation that was either the baseline or followed by a
    /// successful pass.
    pub fn last_known(&self) -> Option<Observation> {
        self.last_known
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current row count plus the stored watermark. An unreadable checkpoint
    /// is reported as no watermark; an unreadable count fails the observation.
    pub async fn observe(&self) -> PipelineResult<Observation> {
        let current_row_count = self.records.count().await?;
        let last_processed_watermark = match self
            .checkpoints
            .read(self.orchestrator.process_name())
            .await
        {
            Ok(row) => row.and_then(|checkpoint| checkpoint.last_processed_timestamp),
            Err(err) => {
                warn!("could not read checkpoint, treating as first run: {}", err);
                None
            }
        };
        Ok(Observation {
            current_row_count,
            last_processed_watermark,
        })
    }

    /// One monitor step. `last_known` only moves on baseline, on no change,
    /// or after a successful pass, so a failed pass is retried on the next
    /// tick.
    pub async fn observe_and_maybe_trigger(&mut self) -> PipelineResult<TriggerDecision> {
        let observation = self.observe().await?;
        let current = observation.current_row_count;
        let previous = self.last_known.map(|known| known.current_row_count);
        let change = ChangeKind::classify(previous, current);
        let delta = previous.map_or(0, |last| current as i64 - last as i64);

        let Some(reason) = change.trigger_reason() else {
            match change {
                ChangeKind::Baseline => info!(
                    rows = current,
                    watermark = %sentinel_domain::format_millis(observation.last_processed_watermark),
                    "baseline row count recorded"
                ),
                _ => info!(rows = current, "no new data"),
            }
            self.last_known = Some(observation);
            return Ok(TriggerDecision::none(change, delta, current));
        };

        match change {
            ChangeKind::Replaced => warn!(
                previous = previous.unwrap_or_default(),
                rows = current,
                "row count decreased, dataset was replaced"
            ),
            _ => info!(delta, rows = current, "new data detected"),
        }
        self.metrics.record_monitor_trigger();

        let pass = self.orchestrator.run_pass(reason).await?;
        self.last_known = Some(Observation {
            current_row_count: current,
            last_processed_watermark: pass.new_watermark,
        });

        Ok(TriggerDecision {
            action: TriggerAction::Triggered,
            change,
            reason: Some(reason),
            delta,
            current_row_count: current,
            pass: Some(pass),
        })
    }

    /// Logs and returns today's alert counts.
    pub async fn log_alert_summary(&self) -> PipelineResult<AlertSummary> {
        let today = millis_to_date(self.clock.now_millis()).unwrap_or_default();
        let summary = alert_queries::daily_summary(self.alerts.as_ref(), today).await?;
        info!(date = %summary.date, total = summary.total, "alert summary");
        for row in &summary.rows {
            info!(
                alert_type = %row.alert_type,
                priority = row.priority.as_str(),
                count = row.count,
                "alert summary row"
            );
        }
        Ok(summary)
    }

    /// Runs until `shutdown` flips to true or its sender is dropped. A tick in
    /// progress always finishes before the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            process_name = %self.orchestrator.process_name(),
            "change monitor started"
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
            self.tick().await;
        }
        info!(ticks = self.ticks, "change monitor stopped");
    }

    pub async fn tick(&mut self) {
        self.ticks += 1;
        self.metrics.record_monitor_tick();

        match self.observe_and_maybe_trigger().await {
            Ok(decision) => {
                if decision.action == TriggerAction::Triggered {
                    if let Some(pass) = &decision.pass {
                        info!(
                            records = pass.records_processed,
                            alerts = pass.alerts_generated,
                            "triggered pass completed"
                        );
                    }
                }
            }
            Err(PipelineError::AlreadyRunning { process_name }) => {
                info!(process_name = %process_name, "pass already running, will check again");
            }
            Err(err) => {
                self.metrics.record_monitor_error();
                error!(kind = err.kind(), "change check failed: {}", err);
            }
        }

        if self.summary_due() {
            if let Err(err) = self.log_alert_summary().await {
                warn!("failed to load alert summary: {}", err);
            }
        }
    }

    fn summary_due(&self) -> bool {
        self.summary_every_ticks > 0
            && (self.ticks == 1 || self.ticks % self.summary_every_ticks == 0)
    }
}
