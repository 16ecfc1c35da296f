// Alert entities
// Candidates come out of the detector; records are what the alert store keeps

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::value_objects::Priority;

pub const VELOCITY_ALERT_TYPE: &str = "VELOCITY";
pub const ALERT_STATUS_OPEN: &str = "OPEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub entity_id: String,
    pub alert_date: NaiveDate,
    pub alert_type: String,
    pub rapid_count: u32,
    pub risk_score: u8,
    pub description: String,
    pub priority: Priority,
    pub total_amount: f64,
    pub first_event_time: i64,
    pub last_event_time: i64,
}

impl AlertCandidate {
    /// Stable identity of the burst, used to skip re-inserting it when a
    /// failed pass is retried over the same records.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.alert_type, self.entity_id, self.alert_date, self.first_event_time, self.last_event_time
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_id: u64,
    pub entity_id: String,
    pub alert_date: NaiveDate,
    pub alert_type: String,
    pub risk_score: u8,
    pub description: String,
    pub priority: Priority,
    pub total_amount: f64,
    pub status: String,
    pub detection_date: NaiveDate,
    pub created_at: i64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummaryRow {
    pub alert_type: String,
    pub priority: Priority,
    pub count: u64,
}
