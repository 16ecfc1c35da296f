// In-process storage
// Implements every storage port behind one lock; used for ephemeral runs and tests

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use sentinel_domain::{
    assign_alert_ids,
    millis_to_date,
    AlertCandidate,
    AlertRecord,
    AlertRepository,
    AlertSummaryRow,
    Checkpoint,
    CheckpointRepository,
    CheckpointUpdate,
    PipelineError,
    PipelineResult,
    RecordSource,
    StatusGuard,
    TransactionRecord,
};

#[derive(Default)]
struct MemoryStore {
    records: Vec<TransactionRecord>,
    checkpoints: HashMap<String, Checkpoint>,
    alerts: Vec<AlertRecord>,
}

#[derive(Default)]
pub struct MemoryRepo {
    store: Mutex<MemoryStore>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records the way the ingestion job would.
    pub async fn append_records(&self, records: impl IntoIterator<Item = TransactionRecord>) {
        let mut store = self.store.lock().await;
        store.records.extend(records);
    }

    /// Swaps the whole dataset, as a full re-upload does.
    pub async fn replace_records(&self, records: Vec<TransactionRecord>) {
        let mut store = self.store.lock().await;
        store.records = records;
    }

    pub async fn alerts(&self) -> Vec<AlertRecord> {
        self.store.lock().await.alerts.clone()
    }

    /// Writes a checkpoint row unconditionally.
    pub async fn put_checkpoint(&self, checkpoint: Checkpoint) {
        let mut store = self.store.lock().await;
        store
            .checkpoints
            .insert(checkpoint.process_name.clone(), checkpoint);
    }
}

#[async_trait]
impl RecordSource for MemoryRepo {
    async fn count(&self) -> PipelineResult<u64> {
        Ok(self.store.lock().await.records.len() as u64)
    }

    async fn query_new_since(&self, watermark: Option<i64>) -> PipelineResult<Vec<TransactionRecord>> {
        let store = self.store.lock().await;
        let mut rows: Vec<TransactionRecord> = store
            .records
            .iter()
            .filter(|record| watermark.map_or(true, |mark| record.event_time > mark))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.event_time
                .cmp(&b.event_time)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        Ok(rows)
    }

    async fn ping(&self) -> PipelineResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CheckpointRepository for MemoryRepo {
    async fn read(&self, process_name: &str) -> PipelineResult<Option<Checkpoint>> {
        Ok(self.store.lock().await.checkpoints.get(process_name).cloned())
    }

    async fn upsert(
        &self,
        process_name: &str,
        update: &CheckpointUpdate,
        guard: StatusGuard,
    ) -> PipelineResult<Checkpoint> {
        let mut store = self.store.lock().await;
        let current = store.checkpoints.get(process_name);
        if !guard.admits(current) {
            return Err(PipelineError::Conflict(format!(
                "checkpoint '{}' is {}",
                process_name,
                current.map_or("absent", |row| row.status.as_str())
            )));
        }
        let next = Checkpoint::applied(current, process_name, update);
        store
            .checkpoints
            .insert(process_name.to_string(), next.clone());
        Ok(next)
    }
}

#[async_trait]
impl AlertRepository for MemoryRepo {
    async fn max_alert_id(&self) -> PipelineResult<u64> {
        let store = self.store.lock().await;
        Ok(store.alerts.iter().map(|alert| alert.alert_id).max().unwrap_or(0))
    }

    async fn insert_all(
        &self,
        candidates: &[AlertCandidate],
        detected_at: i64,
    ) -> PipelineResult<Vec<AlertRecord>> {
        let mut store = self.store.lock().await;
        let max_existing = store.alerts.iter().map(|alert| alert.alert_id).max().unwrap_or(0);
        let existing: HashSet<String> = store
            .alerts
            .iter()
            .map(|alert| alert.fingerprint.clone())
            .collect();
        let written = assign_alert_ids(max_existing, candidates, &existing, detected_at);
        store.alerts.extend(written.iter().cloned());
        Ok(written)
    }

    async fn fetch_alerts(&self, date: NaiveDate, limit: usize) -> PipelineResult<Vec<AlertRecord>> {
        let store = self.store.lock().await;
        let mut rows: Vec<AlertRecord> = store
            .alerts
            .iter()
            .filter(|alert| alert.alert_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.risk_score
                .cmp(&a.risk_score)
                .then_with(|| a.alert_id.cmp(&b.alert_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_summary(&self, date: NaiveDate) -> PipelineResult<Vec<AlertSummaryRow>> {
        let store = self.store.lock().await;
        let mut counts: BTreeMap<(String, &'static str), AlertSummaryRow> = BTreeMap::new();
        for alert in store
            .alerts
            .iter()
            .filter(|alert| millis_to_date(alert.created_at) == Some(date))
        {
            counts
                .entry((alert.alert_type.clone(), alert.priority.as_str()))
                .or_insert_with(|| AlertSummaryRow {
                    alert_type: alert.alert_type.clone(),
                    priority: alert.priority,
                    count: 0,
                })
                .count += 1;
        }
        Ok(counts.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_domain::{CheckpointStatus, PassReason, Priority, WatermarkChange};

    fn record(id: &str, event_time: i64) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            entity_key: "Jane_Doe".to_string(),
            event_time,
            amount: 10.0,
            merchant: "m".to_string(),
            category: "c".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            merchant_latitude: 0.0,
            merchant_longitude: 0.0,
        }
    }

    fn candidate(entity: &str, first: i64) -> AlertCandidate {
        AlertCandidate {
            entity_id: entity.to_string(),
            alert_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            alert_type: "VELOCITY".to_string(),
            rapid_count: 5,
            risk_score: 75,
            description: "test".to_string(),
            priority: Priority::Low,
            total_amount: 50.0,
            first_event_time: first,
            last_event_time: first + 1,
        }
    }

    #[tokio::test]
    async fn query_new_since_is_strict_and_ordered() {
        let repo = MemoryRepo::new();
        repo.append_records(vec![record("c", 30), record("a", 10), record("b", 20)])
            .await;

        let all = repo.query_new_since(None).await.expect("query");
        let ids: Vec<&str> = all.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let newer = repo.query_new_since(Some(20)).await.expect("query");
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].transaction_id, "c");
        assert_eq!(repo.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn upsert_enforces_guard() {
        let repo = MemoryRepo::new();
        let begin = CheckpointUpdate::begin("run-1", PassReason::Manual, "2024-03-01".to_string(), 1);
        let row = repo
            .upsert("p", &begin, StatusGuard::NotProcessing { stale_before: None })
            .await
            .expect("first begin");
        assert_eq!(row.status, CheckpointStatus::Processing);

        let err = repo
            .upsert("p", &begin, StatusGuard::NotProcessing { stale_before: None })
            .await
            .expect_err("second begin");
        assert!(matches!(err, PipelineError::Conflict(_)));

        let complete = CheckpointUpdate::complete(WatermarkChange::Advance(99), 3, 0, 5, 2);
        let row = repo
            .upsert("p", &complete, StatusGuard::HeldBy("run-1".to_string()))
            .await
            .expect("complete");
        assert_eq!(row.last_processed_timestamp, Some(99));
        assert_eq!(row.total_records_processed, 3);
    }

    #[tokio::test]
    async fn insert_all_skips_known_fingerprints() {
        let repo = MemoryRepo::new();
        let first = repo
            .insert_all(&[candidate("A", 1), candidate("B", 2)], 1_000)
            .await
            .expect("insert");
        assert_eq!(first.iter().map(|a| a.alert_id).collect::<Vec<_>>(), vec![1, 2]);

        let second = repo
            .insert_all(&[candidate("B", 2), candidate("C", 3)], 2_000)
            .await
            .expect("insert");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].entity_id, "C");
        assert_eq!(second[0].alert_id, 3);
        assert_eq!(repo.max_alert_id().await.expect("max"), 3);
    }

    #[tokio::test]
    async fn summary_groups_by_type_and_priority() {
        let repo = MemoryRepo::new();
        let mut high = candidate("H", 10);
        high.priority = Priority::High;
        repo.insert_all(&[candidate("A", 1), candidate("B", 2), high], 0)
            .await
            .expect("insert");

        let day = NaiveDate::from_ymd_opt(1970, 1, 1).expect("date");
        let summary = repo.fetch_summary(day).await.expect("summary");
        assert_eq!(summary.len(), 2);
        let low = summary
            .iter()
            .find(|row| row.priority == Priority::Low)
            .expect("low row");
        assert_eq!(low.count, 2);

        let other_day = NaiveDate::from_ymd_opt(2024, 3, 2).expect("date");
        assert!(repo.fetch_summary(other_day).await.expect("summary").is_empty());
    }
}
