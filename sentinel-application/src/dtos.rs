use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sentinel_domain::AlertSummaryRow;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub date: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub date: NaiveDate,
    pub total: u64,
    pub rows: Vec<AlertSummaryRow>,
}
