// Why a detection pass was started

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PassReason {
    /// Row count grew since the last observation.
    Growth,
    /// Row count shrank: the dataset was truncated or reloaded.
    Replaced,
    /// Operator or upload path asked for a pass.
    Manual,
}

impl PassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassReason::Growth => "GROWTH",
            PassReason::Replaced => "REPLACED",
            PassReason::Manual => "MANUAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "GROWTH" => Some(PassReason::Growth),
            "REPLACED" => Some(PassReason::Replaced),
            "MANUAL" => Some(PassReason::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for PassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
