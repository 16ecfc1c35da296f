use chrono::NaiveDate;
use time::OffsetDateTime;

pub fn millis_to_utc(ms: i64) -> OffsetDateTime {
    let nanos = i128::from(ms).saturating_mul(1_000_000);
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn utc_to_millis(value: OffsetDateTime) -> i64 {
    i64::try_from(value.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// ClickHouse `Date` travels as days since 1970-01-01.
pub fn date_to_days(date: NaiveDate) -> u16 {
    let days = date.signed_duration_since(NaiveDate::default()).num_days();
    u16::try_from(days.max(0)).unwrap_or(u16::MAX)
}

pub fn days_to_date(days: u16) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(i64::from(days))
}

/// Table and database names are spliced into SQL, so only plain identifiers
/// are accepted.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        && !value.starts_with(|ch: char| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip_through_offset_datetime() {
        let ms = 1_709_287_200_123;
        assert_eq!(utc_to_millis(millis_to_utc(ms)), ms);
    }

    #[test]
    fn dates_map_to_clickhouse_day_numbers() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        assert_eq!(date_to_days(date), 19_783);
        assert_eq!(days_to_date(19_783), date);
        assert_eq!(date_to_days(NaiveDate::default()), 0);
    }

    #[test]
    fn identifiers_reject_sql_fragments() {
        assert!(is_identifier("aml_alerts_level1"));
        assert!(!is_identifier("alerts; DROP TABLE x"));
        assert!(!is_identifier("1table"));
        assert!(!is_identifier(""));
    }
}
