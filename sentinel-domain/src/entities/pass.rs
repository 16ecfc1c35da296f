// Pass and trigger outcomes reported to callers

use serde::{Deserialize, Serialize};

use crate::value_objects::PassReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Completed,
    /// Nothing new since the watermark.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResult {
    pub run_id: String,
    pub process_name: String,
    pub reason: PassReason,
    pub outcome: PassOutcome,
    pub records_processed: u64,
    pub alerts_generated: u64,
    pub first_alert_id: Option<u64>,
    pub previous_watermark: Option<i64>,
    pub new_watermark: Option<i64>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub current_row_count: u64,
    pub last_processed_watermark: Option<i64>,
}

/// How the monitor classified the latest row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Baseline,
    Unchanged,
    Growth,
    Replaced,
}

impl ChangeKind {
    pub fn classify(last_known: Option<u64>, current: u64) -> Self {
        match last_known {
            None => ChangeKind::Baseline,
            Some(last) if current > last => ChangeKind::Growth,
            Some(last) if current < last => ChangeKind::Replaced,
            Some(_) => ChangeKind::Unchanged,
        }
    }

    pub fn trigger_reason(&self) -> Option<PassReason> {
        match self {
            ChangeKind::Growth => Some(PassReason::Growth),
            ChangeKind::Replaced => Some(PassReason::Replaced),
            ChangeKind::Baseline | ChangeKind::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerAction {
    None,
    Triggered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub action: TriggerAction,
    pub change: ChangeKind,
    pub reason: Option<PassReason>,
    /// `current - last_known`; zero on baseline.
    pub delta: i64,
    pub current_row_count: u64,
    pub pass: Option<PassResult>,
}

impl TriggerDecision {
    pub fn none(change: ChangeKind, delta: i64, current_row_count: u64) -> Self {
        Self {
            action: TriggerAction::None,
            change,
            reason: None,
            delta,
            current_row_count,
            pass: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_branch() {
        assert_eq!(ChangeKind::classify(None, 10), ChangeKind::Baseline);
        assert_eq!(ChangeKind::classify(Some(10), 10), ChangeKind::Unchanged);
        assert_eq!(ChangeKind::classify(Some(10), 11), ChangeKind::Growth);
        assert_eq!(ChangeKind::classify(Some(10), 9), ChangeKind::Replaced);
        assert_eq!(ChangeKind::classify(None, 0), ChangeKind::Baseline);
    }

    #[test]
    fn only_growth_and_replacement_trigger() {
        assert_eq!(ChangeKind::Growth.trigger_reason(), Some(PassReason::Growth));
        assert_eq!(ChangeKind::Replaced.trigger_reason(), Some(PassReason::Replaced));
        assert_eq!(ChangeKind::Baseline.trigger_reason(), None);
        assert_eq!(ChangeKind::Unchanged.trigger_reason(), None);
    }
}
