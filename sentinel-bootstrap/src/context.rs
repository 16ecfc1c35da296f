use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use sentinel_application::AppState;
use sentinel_domain::{AlertRepository, CheckpointRepository, RecordSource, SystemClock};
use sentinel_infrastructure::{
    AppConfig,
    ClickhouseRepo,
    DefaultHealthService,
    MemoryRepo,
    StorageBackend,
};

type Ports = (
    Arc<dyn RecordSource>,
    Arc<dyn CheckpointRepository>,
    Arc<dyn AlertRepository>,
);

fn ports<R>(repo: Arc<R>) -> Ports
where
    R: RecordSource + CheckpointRepository + AlertRepository + 'static,
{
    (repo.clone(), repo.clone(), repo)
}

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();

        let (records, checkpoints, alerts) = match config.storage_backend() {
            StorageBackend::Clickhouse => {
                let db_config = config.to_db_config();
                let repo = Arc::new(ClickhouseRepo::connect(&db_config));
                repo.ensure_schema()
                    .await
                    .with_context(|| format!("failed to prepare schema at {}", db_config.clickhouse_url))?;
                info!(
                    url = %db_config.clickhouse_url,
                    database = %db_config.clickhouse_database,
                    "using clickhouse storage"
                );
                ports(repo)
            }
            StorageBackend::Memory => {
                warn!("using in-memory storage, nothing will be persisted");
                ports(Arc::new(MemoryRepo::new()))
            }
        };

        let health = Arc::new(DefaultHealthService::new(records.clone()));
        let state = AppState::new(
            runtime_config,
            records,
            checkpoints,
            alerts,
            health,
            Arc::new(SystemClock),
        );

        Ok(Self { state })
    }
}
