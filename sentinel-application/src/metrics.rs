use std::sync::atomic::{AtomicU64, Ordering};

use sentinel_domain::{PassOutcome, PassResult};

#[derive(Debug, Default)]
pub struct Metrics {
    passes_completed: AtomicU64,
    passes_noop: AtomicU64,
    passes_failed: AtomicU64,
    passes_rejected: AtomicU64,
    records_processed: AtomicU64,
    alerts_generated: AtomicU64,
    monitor_ticks: AtomicU64,
    monitor_triggers: AtomicU64,
    monitor_errors: AtomicU64,
}

impl Metrics {
    pub fn record_pass(&self, result: &PassResult) {
        match result.outcome {
            PassOutcome::Completed => self.passes_completed.fetch_add(1, Ordering::Relaxed),
            PassOutcome::NoOp => self.passes_noop.fetch_add(1, Ordering::Relaxed),
        };
        self.records_processed
            .fetch_add(result.records_processed, Ordering::Relaxed);
        self.alerts_generated
            .fetch_add(result.alerts_generated, Ordering::Relaxed);
    }

    pub fn record_pass_failed(&self) {
        self.passes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_rejected(&self) {
        self.passes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_monitor_tick(&self) {
        self.monitor_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_monitor_trigger(&self) {
        self.monitor_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_monitor_error(&self) {
        self.monitor_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }

    pub fn passes_rejected(&self) -> u64 {
        self.passes_rejected.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let completed = self.passes_completed.load(Ordering::Relaxed);
        let noop = self.passes_noop.load(Ordering::Relaxed);
        let failed = self.passes_failed.load(Ordering::Relaxed);
        let rejected = self.passes_rejected.load(Ordering::Relaxed);
        let records = self.records_processed.load(Ordering::Relaxed);
        let alerts = self.alerts_generated.load(Ordering::Relaxed);
        let ticks = self.monitor_ticks.load(Ordering::Relaxed);
        let triggers = self.monitor_triggers.load(Ordering::Relaxed);
        let errors = self.monitor_errors.load(Ordering::Relaxed);

        format!(
            "# TYPE sentinel_passes_total counter\n\
sentinel_passes_total{{outcome=\"completed\"}} {}\n\
sentinel_passes_total{{outcome=\"noop\"}} {}\n\
sentinel_passes_total{{outcome=\"failed\"}} {}\n\
sentinel_passes_total{{outcome=\"rejected\"}} {}\n\
# TYPE sentinel_records_processed_total counter\n\
sentinel_records_processed_total {}\n\
# TYPE sentinel_alerts_generated_total counter\n\
sentinel_alerts_generated_total {}\n\
# TYPE sentinel_monitor_ticks_total counter\n\
sentinel_monitor_ticks_total {}\n\
# TYPE sentinel_monitor_triggers_total counter\n\
sentinel_monitor_triggers_total {}\n\
# TYPE sentinel_monitor_errors_total counter\n\
sentinel_monitor_errors_total {}\n",
            completed, noop, failed, rejected, records, alerts, ticks, triggers, errors
        )
    }
}
