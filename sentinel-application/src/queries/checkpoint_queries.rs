use sentinel_domain::Checkpoint;

use crate::error::AppError;
use crate::state::AppState;

/// Stored checkpoint, or a fresh IDLE one when no pass has run yet.
pub async fn get_checkpoint(state: &AppState) -> Result<Checkpoint, AppError> {
    let process_name = state.orchestrator.process_name();
    let row = state.checkpoints.read(process_name).await?;
    Ok(row.unwrap_or_else(|| Checkpoint::new(process_name)))
}
