use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::info;

use sentinel_domain::{
    assign_alert_ids,
    entity_key,
    AlertCandidate,
    AlertRecord,
    AlertRepository,
    AlertSummaryRow,
    Checkpoint,
    CheckpointRepository,
    CheckpointStatus,
    CheckpointUpdate,
    DbConfig,
    PassReason,
    PipelineError,
    PipelineResult,
    Priority,
    RecordSource,
    StatusGuard,
    TransactionRecord,
};

use crate::utils::{date_to_days, days_to_date, millis_to_utc, utc_to_millis};

#[derive(Debug, Clone, Deserialize, Row)]
struct TransactionRow {
    transaction_id: String,
    first_name: String,
    last_name: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    event_time: OffsetDateTime,
    amount: f64,
    merchant: String,
    category: String,
    latitude: f64,
    longitude: f64,
    merchant_latitude: f64,
    merchant_longitude: f64,
}

impl From<TransactionRow> for TransactionRecord {
    fn from(row: TransactionRow) -> Self {
        TransactionRecord {
            transaction_id: row.transaction_id,
            entity_key: entity_key(&row.first_name, &row.last_name),
            event_time: utc_to_millis(row.event_time),
            amount: row.amount,
            merchant: row.merchant,
            category: row.category,
            latitude: row.latitude,
            longitude: row.longitude,
            merchant_latitude: row.merchant_latitude,
            merchant_longitude: row.merchant_longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct CheckpointRow {
    process_name: String,
    last_processed_ms: Option<i64>,
    total_records_processed: u64,
    alerts_generated: u64,
    status: String,
    holder: String,
    last_reason: String,
    last_run_date: String,
    last_duration_ms: u64,
    last_error: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    updated_at: OffsetDateTime,
    version: u64,
}

impl From<&Checkpoint> for CheckpointRow {
    fn from(checkpoint: &Checkpoint) -> Self {
        CheckpointRow {
            process_name: checkpoint.process_name.clone(),
            last_processed_ms: checkpoint.last_processed_timestamp,
            total_records_processed: checkpoint.total_records_processed,
            alerts_generated: checkpoint.alerts_generated,
            status: checkpoint.status.as_str().to_string(),
            holder: checkpoint.holder.clone().unwrap_or_default(),
            last_reason: checkpoint
                .last_reason
                .map(|reason| reason.as_str().to_string())
                .unwrap_or_default(),
            last_run_date: checkpoint.last_run_date.clone().unwrap_or_default(),
            last_duration_ms: checkpoint.last_duration_ms,
            last_error: checkpoint.last_error.clone().unwrap_or_default(),
            updated_at: millis_to_utc(checkpoint.updated_at),
            version: checkpoint.version,
        }
    }
}

impl From<CheckpointRow> for Checkpoint {
    fn from(row: CheckpointRow) -> Self {
        Checkpoint {
            process_name: row.process_name,
            last_processed_timestamp: row.last_processed_ms,
            total_records_processed: row.total_records_processed,
            alerts_generated: row.alerts_generated,
            status: CheckpointStatus::from(row.status.as_str()),
            holder: Some(row.holder).filter(|holder| !holder.is_empty()),
            last_reason: PassReason::parse(&row.last_reason),
            last_run_date: Some(row.last_run_date).filter(|date| !date.is_empty()),
            last_duration_ms: row.last_duration_ms,
            last_error: Some(row.last_error).filter(|error| !error.is_empty()),
            updated_at: utc_to_millis(row.updated_at),
            version: row.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
struct AlertRow {
    alert_id: u64,
    customer_id: String,
    alert_date: u16,
    alert_type: String,
    risk_score: u8,
    description: String,
    priority: String,
    total_amount: f64,
    status: String,
    detection_date: u16,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    created_at: OffsetDateTime,
    fingerprint: String,
}

impl From<&AlertRecord> for AlertRow {
    fn from(alert: &AlertRecord) -> Self {
        AlertRow {
            alert_id: alert.alert_id,
            customer_id: alert.entity_id.clone(),
            alert_date: date_to_days(alert.alert_date),
            alert_type: alert.alert_type.clone(),
            risk_score: alert.risk_score,
            description: alert.description.clone(),
            priority: alert.priority.as_str().to_string(),
            total_amount: alert.total_amount,
            status: alert.status.clone(),
            detection_date: date_to_days(alert.detection_date),
            created_at: millis_to_utc(alert.created_at),
            fingerprint: alert.fingerprint.clone(),
        }
    }
}

impl From<AlertRow> for AlertRecord {
    fn from(row: AlertRow) -> Self {
        AlertRecord {
            alert_id: row.alert_id,
            entity_id: row.customer_id,
            alert_date: days_to_date(row.alert_date),
            alert_type: row.alert_type,
            risk_score: row.risk_score,
            description: row.description,
            priority: Priority::from(row.priority.as_str()),
            total_amount: row.total_amount,
            status: row.status,
            detection_date: days_to_date(row.detection_date),
            created_at: utc_to_millis(row.created_at),
            fingerprint: row.fingerprint,
        }
    }
}

const ALERT_COLUMNS: &str = "alert_id, customer_id, alert_date, alert_type, risk_score, description, \
     priority, total_amount, status, detection_date, created_at, fingerprint";

const CHECKPOINT_COLUMNS: &str = "process_name, last_processed_ms, total_records_processed, alerts_generated, \
     status, holder, last_reason, last_run_date, last_duration_ms, last_error, updated_at, version";

/// ClickHouse has no multi-statement transactions, so the read-compare-write
/// steps below are serialised in-process. One writer per process name.
pub struct ClickhouseRepo {
    client: Client,
    database: String,
    transactions_table: String,
    checkpoint_table: String,
    alerts_table: String,
    checkpoint_lock: Mutex<()>,
    alert_lock: Mutex<()>,
}

impl ClickhouseRepo {
    pub fn new(client: Client, config: &DbConfig) -> Self {
        Self {
            client,
            database: config.clickhouse_database.clone(),
            transactions_table: config.transactions_table.clone(),
            checkpoint_table: config.checkpoint_table.clone(),
            alerts_table: config.alerts_table.clone(),
            checkpoint_lock: Mutex::new(()),
            alert_lock: Mutex::new(()),
        }
    }

    pub fn connect(config: &DbConfig) -> Self {
        let mut client = Client::default()
            .with_url(&config.clickhouse_url)
            .with_database(&config.clickhouse_database);
        if let Some(user) = &config.clickhouse_user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.clickhouse_password {
            client = client.with_password(password);
        }
        Self::new(client, config)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        let create_transactions = format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    trans_date_trans_time DateTime64(3),
    cc_num Int64,
    merchant String,
    category String,
    amt Float64,
    first String,
    last String,
    gender String,
    street String,
    city String,
    state String,
    zip String,
    lat Float64,
    long Float64,
    city_pop Int64,
    job String,
    dob String,
    trans_num String,
    unix_time Int64,
    merch_lat Float64,
    merch_long Float64,
    is_fraud UInt8
) ENGINE = MergeTree
PARTITION BY toYYYYMM(trans_date_trans_time)
ORDER BY (trans_date_trans_time, trans_num)
"#,
            self.transactions_table
        );
        self.client.query(&create_transactions).execute().await?;

        let create_checkpoints = format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    process_name String,
    last_processed_ms Nullable(Int64),
    total_records_processed UInt64,
    alerts_generated UInt64,
    status String,
    holder String,
    last_reason String,
    last_run_date String,
    last_duration_ms UInt64,
    last_error String,
    updated_at DateTime64(3),
    version UInt64
) ENGINE = ReplacingMergeTree(version)
ORDER BY process_name
"#,
            self.checkpoint_table
        );
        self.client.query(&create_checkpoints).execute().await?;

        let create_alerts = format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    alert_id UInt64,
    customer_id String,
    alert_date Date,
    alert_type String,
    risk_score UInt8,
    description String,
    priority String,
    total_amount Float64,
    status String,
    detection_date Date,
    created_at DateTime64(3),
    fingerprint String
) ENGINE = MergeTree
PARTITION BY toYYYYMM(alert_date)
ORDER BY alert_id
"#,
            self.alerts_table
        );
        self.client.query(&create_alerts).execute().await?;

        info!(database = %self.database, "clickhouse schema ready");
        Ok(())
    }

    async fn read_checkpoint(&self, process_name: &str) -> PipelineResult<Option<Checkpoint>> {
        let query = format!(
            "SELECT {} FROM {} FINAL WHERE process_name = ? ORDER BY version DESC LIMIT 1",
            CHECKPOINT_COLUMNS, self.checkpoint_table
        );
        let rows = self
            .client
            .query(&query)
            .bind(process_name)
            .fetch_all::<CheckpointRow>()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(rows.into_iter().next().map(Checkpoint::from))
    }

    async fn current_max_alert_id(&self) -> PipelineResult<u64> {
        let query = format!("SELECT max(alert_id) FROM {}", self.alerts_table);
        self.client
            .query(&query)
            .fetch_one::<u64>()
            .await
            .map_err(PipelineError::source_unavailable)
    }

    async fn existing_fingerprints(&self, candidates: &[AlertCandidate]) -> PipelineResult<HashSet<String>> {
        let fingerprints: Vec<String> = candidates.iter().map(AlertCandidate::fingerprint).collect();
        let query = format!(
            "SELECT fingerprint FROM {} WHERE has(?, fingerprint)",
            self.alerts_table
        );
        let rows = self
            .client
            .query(&query)
            .bind(fingerprints)
            .fetch_all::<String>()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl RecordSource for ClickhouseRepo {
    async fn count(&self) -> PipelineResult<u64> {
        let query = format!("SELECT count() FROM {}", self.transactions_table);
        self.client
            .query(&query)
            .fetch_one::<u64>()
            .await
            .map_err(PipelineError::source_unavailable)
    }

    async fn query_new_since(&self, watermark: Option<i64>) -> PipelineResult<Vec<TransactionRecord>> {
        let mut query = format!(
            "SELECT trans_num AS transaction_id, \
             first AS first_name, last AS last_name, \
             trans_date_trans_time AS event_time, amt AS amount, merchant, category, \
             lat AS latitude, long AS longitude, merch_lat AS merchant_latitude, \
             merch_long AS merchant_longitude \
             FROM {}",
            self.transactions_table
        );
        if watermark.is_some() {
            query.push_str(" WHERE trans_date_trans_time > fromUnixTimestamp64Milli(toInt64(?))");
        }
        query.push_str(" ORDER BY trans_date_trans_time, trans_num");

        let mut request = self.client.query(&query);
        if let Some(mark) = watermark {
            request = request.bind(mark);
        }
        let rows = request
            .fetch_all::<TransactionRow>()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    async fn ping(&self) -> PipelineResult<()> {
        let _: u8 = self
            .client
            .query("SELECT toUInt8(1)")
            .fetch_one()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointRepository for ClickhouseRepo {
    async fn read(&self, process_name: &str) -> PipelineResult<Option<Checkpoint>> {
        self.read_checkpoint(process_name).await
    }

    async fn upsert(
        &self,
        process_name: &str,
        update: &CheckpointUpdate,
        guard: StatusGuard,
    ) -> PipelineResult<Checkpoint> {
        let _lock = self.checkpoint_lock.lock().await;
        let current = self.read_checkpoint(process_name).await?;
        if !guard.admits(current.as_ref()) {
            return Err(PipelineError::Conflict(format!(
                "checkpoint '{}' is {}",
                process_name,
                current.as_ref().map_or("absent", |row| row.status.as_str())
            )));
        }
        let next = Checkpoint::applied(current.as_ref(), process_name, update);

        let mut insert = self
            .client
            .insert(&self.checkpoint_table)
            .map_err(PipelineError::source_unavailable)?;
        insert
            .write(&CheckpointRow::from(&next))
            .await
            .map_err(PipelineError::source_unavailable)?;
        insert.end().await.map_err(PipelineError::source_unavailable)?;
        Ok(next)
    }
}

#[async_trait]
impl AlertRepository for ClickhouseRepo {
    async fn max_alert_id(&self) -> PipelineResult<u64> {
        self.current_max_alert_id().await
    }

    async fn insert_all(
        &self,
        candidates: &[AlertCandidate],
        detected_at: i64,
    ) -> PipelineResult<Vec<AlertRecord>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let _lock = self.alert_lock.lock().await;
        let existing = self.existing_fingerprints(candidates).await?;
        let max_existing = self.current_max_alert_id().await?;
        let written = assign_alert_ids(max_existing, candidates, &existing, detected_at);
        if written.is_empty() {
            return Ok(written);
        }

        // One INSERT block; ClickHouse applies it whole or not at all.
        let mut insert = self
            .client
            .insert(&self.alerts_table)
            .map_err(PipelineError::source_unavailable)?;
        for alert in &written {
            insert
                .write(&AlertRow::from(alert))
                .await
                .map_err(PipelineError::source_unavailable)?;
        }
        insert.end().await.map_err(PipelineError::source_unavailable)?;
        Ok(written)
    }

    async fn fetch_alerts(&self, date: NaiveDate, limit: usize) -> PipelineResult<Vec<AlertRecord>> {
        let query = format!(
            "SELECT {} FROM {} WHERE alert_date = toDate(?) ORDER BY risk_score DESC, alert_id LIMIT ?",
            ALERT_COLUMNS, self.alerts_table
        );
        let rows = self
            .client
            .query(&query)
            .bind(date.to_string())
            .bind(limit as u64)
            .fetch_all::<AlertRow>()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(rows.into_iter().map(AlertRecord::from).collect())
    }

    async fn fetch_summary(&self, date: NaiveDate) -> PipelineResult<Vec<AlertSummaryRow>> {
        let query = format!(
            "SELECT alert_type, priority, count() AS cnt FROM {} \
             WHERE toDate(created_at) = toDate(?) \
             GROUP BY alert_type, priority ORDER BY alert_type, priority",
            self.alerts_table
        );
        let rows = self
            .client
            .query(&query)
            .bind(date.to_string())
            .fetch_all::<(String, String, u64)>()
            .await
            .map_err(PipelineError::source_unavailable)?;
        Ok(rows
            .into_iter()
            .map(|(alert_type, priority, count)| AlertSummaryRow {
                alert_type,
                priority: Priority::from(priority.as_str()),
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_domain::WatermarkChange;

    #[test]
    fn transaction_rows_derive_trimmed_entity_key() {
        let row = TransactionRow {
            transaction_id: "2da90c7d74bd46a0caf3777415b3ebd3".to_string(),
            first_name: " Jennifer".to_string(),
            last_name: "Banks ".to_string(),
            event_time: millis_to_utc(1_709_287_200_000),
            amount: 4.97,
            merchant: "fraud_Rippin, Kub and Mann".to_string(),
            category: "misc_net".to_string(),
            latitude: 36.0788,
            longitude: -81.1781,
            merchant_latitude: 36.011293,
            merchant_longitude: -82.048315,
        };
        let record = TransactionRecord::from(row);
        assert_eq!(record.entity_key, "Jennifer_Banks");
        assert_eq!(record.event_time, 1_709_287_200_000);
    }

    #[test]
    fn checkpoint_rows_keep_optional_fields() {
        let begin = CheckpointUpdate::begin("run-1", PassReason::Growth, "2024-03-01".to_string(), 1_000);
        let started = Checkpoint::applied(None, "aml_processing", &begin);
        let complete = CheckpointUpdate::complete(WatermarkChange::Advance(1_709_287_200_000), 12, 1, 40, 2_000);
        let done = Checkpoint::applied(Some(&started), "aml_processing", &complete);

        let restored = Checkpoint::from(CheckpointRow::from(&done));
        assert_eq!(restored, done);
        assert_eq!(restored.last_reason, Some(PassReason::Growth));
        assert_eq!(restored.last_error, None);
        assert_eq!(restored.holder, None);

        let held = Checkpoint::from(CheckpointRow::from(&started));
        assert_eq!(held.holder.as_deref(), Some("run-1"));
    }

    #[test]
    fn alert_rows_map_customer_and_dates() {
        let candidate = AlertCandidate {
            entity_id: "Jane_Doe".to_string(),
            alert_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            alert_type: "VELOCITY".to_string(),
            rapid_count: 7,
            risk_score: 100,
            description: "Rapid transactions detected".to_string(),
            priority: Priority::Medium,
            total_amount: 70.5,
            first_event_time: 1,
            last_event_time: 2,
        };
        let records = assign_alert_ids(4, &[candidate], &HashSet::new(), 1_709_300_000_000);
        let row = AlertRow::from(&records[0]);
        assert_eq!(row.customer_id, "Jane_Doe");
        assert_eq!(row.alert_id, 5);
        assert_eq!(row.priority, "MEDIUM");

        let restored = AlertRecord::from(row);
        assert_eq!(restored, records[0]);
    }
}
