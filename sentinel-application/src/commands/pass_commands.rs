use anyhow::anyhow;

use sentinel_domain::{PassReason, PassResult};

use crate::error::AppError;
use crate::state::AppState;

/// Runs a MANUAL pass on its own task. Dropping the returned future (request
/// timeout, client gone) does not abort the pass; it still completes or
/// records FAILED on the checkpoint.
pub async fn run_manual_pass(state: &AppState) -> Result<PassResult, AppError> {
    let orchestrator = state.orchestrator.clone();
    let handle = tokio::spawn(async move { orchestrator.run_pass(PassReason::Manual).await });
    let result = handle
        .await
        .map_err(|err| AppError::Internal(anyhow!("pass task failed: {}", err)))?;
    Ok(result?)
}
