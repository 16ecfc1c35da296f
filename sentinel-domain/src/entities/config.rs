// Runtime configuration handed to the application layer

use serde::{Deserialize, Serialize};

use crate::value_objects::ReplacePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Max whole minutes between two events for the later one to count as rapid.
    pub rapid_threshold_minutes: u32,
    /// Rapid events per entity/day needed to raise an alert.
    pub min_rapid_count: u32,
    /// Trailing window ending at processing time; 0 disables the cutoff.
    pub lookback_hours: u32,
    pub risk_multiplier: u32,
    pub risk_floor: u8,
    pub risk_ceiling: u8,
    pub priority_high_min: u32,
    pub priority_medium_min: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rapid_threshold_minutes: 5,
            min_rapid_count: 5,
            lookback_hours: 24,
            risk_multiplier: 15,
            risk_floor: 60,
            risk_ceiling: 100,
            priority_high_min: 10,
            priority_medium_min: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub process_name: String,
    pub monitor_enabled: bool,
    pub monitor_interval_seconds: u64,
    pub summary_every_ticks: u64,
    pub replace_policy: ReplacePolicy,
    pub stale_processing_seconds: u64,
    pub request_timeout_seconds: u64,
    pub detection: DetectionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            process_name: "aml_processing".to_string(),
            monitor_enabled: true,
            monitor_interval_seconds: 30,
            summary_every_ticks: 10,
            replace_policy: ReplacePolicy::Reprocess,
            stale_processing_seconds: 3600,
            request_timeout_seconds: 120,
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub transactions_table: String,
    pub checkpoint_table: String,
    pub alerts_table: String,
}
