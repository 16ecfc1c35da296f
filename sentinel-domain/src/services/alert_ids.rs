use std::collections::HashSet;

use crate::entities::{AlertCandidate, AlertRecord, ALERT_STATUS_OPEN};
use crate::utils::millis_to_date;

/// Turns ranked candidates into records with IDs `max_existing + rank`.
/// Candidates whose fingerprint is in `existing` are dropped first, so ranks
/// stay dense over what is actually written. Callers must hold whatever lock
/// makes `max_existing` current.
pub fn assign_alert_ids(
    max_existing: u64,
    candidates: &[AlertCandidate],
    existing: &HashSet<String>,
    detected_at: i64,
) -> Vec<AlertRecord> {
    let detection_date = millis_to_date(detected_at).unwrap_or_default();
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(|candidate| {
            let fingerprint = candidate.fingerprint();
            if existing.contains(&fingerprint) || !seen.insert(fingerprint.clone()) {
                return None;
            }
            Some((candidate, fingerprint))
        })
        .enumerate()
        .map(|(index, (candidate, fingerprint))| AlertRecord {
            alert_id: max_existing + index as u64 + 1,
            entity_id: candidate.entity_id.clone(),
            alert_date: candidate.alert_date,
            alert_type: candidate.alert_type.clone(),
            risk_score: candidate.risk_score,
            description: candidate.description.clone(),
            priority: candidate.priority,
            total_amount: candidate.total_amount,
            status: ALERT_STATUS_OPEN.to_string(),
            detection_date,
            created_at: detected_at,
            fingerprint,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Priority;
    use chrono::NaiveDate;

    fn candidate(entity: &str, count: u32, first: i64) -> AlertCandidate {
        AlertCandidate {
            entity_id: entity.to_string(),
            alert_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            alert_type: "VELOCITY".to_string(),
            rapid_count: count,
            risk_score: 75,
            description: String::new(),
            priority: Priority::Low,
            total_amount: 10.0,
            first_event_time: first,
            last_event_time: first + 1,
        }
    }

    #[test]
    fn ids_are_offset_by_existing_max() {
        let records = assign_alert_ids(
            41,
            &[candidate("b", 9, 0), candidate("a", 5, 0)],
            &HashSet::new(),
            0,
        );
        let ids: Vec<u64> = records.iter().map(|r| r.alert_id).collect();
        assert_eq!(ids, vec![42, 43]);
        assert_eq!(records[0].entity_id, "b");
        assert_eq!(records[0].status, "OPEN");
    }

    #[test]
    fn known_fingerprints_are_skipped_without_gaps() {
        let dup = candidate("a", 8, 100);
        let existing: HashSet<String> = [dup.fingerprint()].into_iter().collect();
        let records = assign_alert_ids(
            7,
            &[dup, candidate("b", 6, 200), candidate("c", 5, 300)],
            &existing,
            0,
        );
        let ids: Vec<(u64, &str)> = records
            .iter()
            .map(|r| (r.alert_id, r.entity_id.as_str()))
            .collect();
        assert_eq!(ids, vec![(8, "b"), (9, "c")]);
    }
}
