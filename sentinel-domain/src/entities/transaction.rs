// Transaction entity
// Immutable card transaction fact written by the external ingestion path

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    /// Derived from the cardholder identity, `first_last`.
    pub entity_key: String,
    /// Event time in epoch milliseconds (UTC).
    pub event_time: i64,
    pub amount: f64,
    pub merchant: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub merchant_latitude: f64,
    pub merchant_longitude: f64,
}

pub fn entity_key(first: &str, last: &str) -> String {
    format!("{}_{}", first.trim(), last.trim())
}

/// Latest event time in a batch, if any.
pub fn max_event_time(records: &[TransactionRecord]) -> Option<i64> {
    records.iter().map(|record| record.event_time).max()
}
