use chrono::{DateTime, NaiveDate, Utc};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60_000;
pub const MILLIS_PER_HOUR: i64 = 3_600_000;

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

pub fn millis_to_date(ms: i64) -> Option<NaiveDate> {
    millis_to_datetime(ms).map(|dt| dt.date_naive())
}

pub fn format_millis(ms: Option<i64>) -> String {
    match ms.and_then(millis_to_datetime) {
        Some(dt) => dt.to_rfc3339(),
        None => "never".to_string(),
    }
}
