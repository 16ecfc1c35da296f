// Checkpoint run status

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckpointStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStatus::Idle => "IDLE",
            CheckpointStatus::Processing => "PROCESSING",
            CheckpointStatus::Completed => "COMPLETED",
            CheckpointStatus::Failed => "FAILED",
        }
    }
}

impl From<&str> for CheckpointStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PROCESSING" => CheckpointStatus::Processing,
            "COMPLETED" => CheckpointStatus::Completed,
            "FAILED" => CheckpointStatus::Failed,
            _ => CheckpointStatus::Idle,
        }
    }
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
