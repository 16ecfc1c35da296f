// How a REPLACED trigger treats the stored watermark

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    /// Scan from the epoch and overwrite the watermark on success.
    #[default]
    Reprocess,
    /// Treat the replacement like ordinary growth.
    Incremental,
}

impl ReplacePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reprocess" => Some(ReplacePolicy::Reprocess),
            "incremental" => Some(ReplacePolicy::Incremental),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplacePolicy::Reprocess => "reprocess",
            ReplacePolicy::Incremental => "incremental",
        }
    }
}
