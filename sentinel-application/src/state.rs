use std::sync::Arc;
use std::time::Duration;

use sentinel_domain::{
    AlertRepository,
    CheckpointRepository,
    Clock,
    HealthCheckService,
    RecordSource,
    RuntimeConfig,
};

use crate::metrics::Metrics;
use crate::monitor::ChangeMonitor;
use crate::orchestrator::PassOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub records: Arc<dyn RecordSource>,
    pub checkpoints: Arc<dyn CheckpointRepository>,
    pub alerts: Arc<dyn AlertRepository>,
    pub health: Arc<dyn HealthCheckService>,
    pub clock: Arc<dyn Clock>,
    pub orchestrator: Arc<PassOrchestrator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        records: Arc<dyn RecordSource>,
        checkpoints: Arc<dyn CheckpointRepository>,
        alerts: Arc<dyn AlertRepository>,
        health: Arc<dyn HealthCheckService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics = Arc::new(Metrics::default());
        let orchestrator = Arc::new(PassOrchestrator::new(
            &config,
            records.clone(),
            checkpoints.clone(),
            alerts.clone(),
            clock.clone(),
            metrics.clone(),
        ));
        Self {
            config,
            records,
            checkpoints,
            alerts,
            health,
            clock,
            orchestrator,
            metrics,
        }
    }

    /// A monitor sharing this state's orchestrator, so monitor-triggered and
    /// manual passes contend for the same checkpoint.
    pub fn change_monitor(&self) -> ChangeMonitor {
        ChangeMonitor::new(
            self.records.clone(),
            self.checkpoints.clone(),
            self.alerts.clone(),
            self.orchestrator.clone(),
            self.clock.clone(),
            self.metrics.clone(),
            Duration::from_secs(self.config.monitor_interval_seconds.max(1)),
            self.config.summary_every_ticks,
        )
    }
}
