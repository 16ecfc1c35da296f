use chrono::NaiveDate;

use sentinel_domain::{millis_to_date, AlertRecord, AlertRepository, PipelineResult};

use crate::dtos::{AlertQuery, AlertSummary, SummaryQuery};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_ALERT_LIMIT: usize = 100;
const MAX_ALERT_LIMIT: usize = 1000;

pub async fn list_alerts(state: &AppState, query: AlertQuery) -> Result<Vec<AlertRecord>, AppError> {
    let date = resolve_date(state, query.date.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).clamp(1, MAX_ALERT_LIMIT);
    Ok(state.alerts.fetch_alerts(date, limit).await?)
}

pub async fn alert_summary(state: &AppState, query: SummaryQuery) -> Result<AlertSummary, AppError> {
    let date = resolve_date(state, query.date.as_deref())?;
    Ok(daily_summary(state.alerts.as_ref(), date).await?)
}

pub async fn daily_summary(alerts: &dyn AlertRepository, date: NaiveDate) -> PipelineResult<AlertSummary> {
    let rows = alerts.fetch_summary(date).await?;
    let total = rows.iter().map(|row| row.count).sum();
    Ok(AlertSummary { date, total, rows })
}

fn resolve_date(state: &AppState, raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("invalid date '{}', expected YYYY-MM-DD", value))),
        None => Ok(millis_to_date(state.clock.now_millis()).unwrap_or_default()),
    }
}
