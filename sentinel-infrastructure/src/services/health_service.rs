use std::sync::Arc;

use async_trait::async_trait;

use sentinel_domain::ports::HealthCheckService;
use sentinel_domain::RecordSource;

pub struct DefaultHealthService {
    records: Arc<dyn RecordSource>,
}

impl DefaultHealthService {
    pub fn new(records: Arc<dyn RecordSource>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_database(&self) -> anyhow::Result<bool> {
        self.records.ping().await.map(|_| true).map_err(anyhow::Error::from)
    }
}
