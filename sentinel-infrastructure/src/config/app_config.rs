use std::env;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use sentinel_domain::{DbConfig, DetectionConfig, ReplacePolicy, RuntimeConfig};

use crate::utils::is_identifier;

pub const CONFIG_PATH_ENV: &str = "SENTINEL_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Clickhouse,
    /// Ephemeral in-process store; nothing survives a restart.
    Memory,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clickhouse" => Some(StorageBackend::Clickhouse),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub storage: String,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub transactions_table: String,
    pub checkpoint_table: String,
    pub alerts_table: String,
    pub process_name: String,
    pub monitor_enabled: bool,
    pub monitor_interval_seconds: u64,
    pub summary_every_ticks: u64,
    pub rapid_threshold_minutes: u32,
    pub min_rapid_count: u32,
    pub lookback_hours: u32,
    pub risk_multiplier: u32,
    pub risk_floor: u8,
    pub risk_ceiling: u8,
    pub priority_high_min: u32,
    pub priority_medium_min: u32,
    pub replace_policy: String,
    pub stale_processing_seconds: u64,
    pub request_timeout_seconds: u64,
    pub log_level: String,
    pub log_format: String,
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let detection = DetectionConfig::default();
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            storage: "clickhouse".to_string(),
            clickhouse_url: "http://127.0.0.1:8123".to_string(),
            clickhouse_database: "aml_data".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            transactions_table: "credit_card_transactions".to_string(),
            checkpoint_table: "processing_metadata".to_string(),
            alerts_table: "aml_alerts_level1".to_string(),
            process_name: "aml_processing".to_string(),
            monitor_enabled: true,
            monitor_interval_seconds: 30,
            summary_every_ticks: 10,
            rapid_threshold_minutes: detection.rapid_threshold_minutes,
            min_rapid_count: detection.min_rapid_count,
            lookback_hours: detection.lookback_hours,
            risk_multiplier: detection.risk_multiplier,
            risk_floor: detection.risk_floor,
            risk_ceiling: detection.risk_ceiling,
            priority_high_min: detection.priority_high_min,
            priority_medium_min: detection.priority_medium_min,
            replace_policy: "reprocess".to_string(),
            stale_processing_seconds: 3600,
            request_timeout_seconds: 120,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`, else `$SENTINEL_CONFIG`, else `./config.toml`. A missing
    /// file means defaults; env overrides apply either way.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_string(),
            None => env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.toml".to_string()),
        };
        let file_path = Path::new(&path);
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path)
                .await
                .with_context(|| format!("failed to read {}", file_path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("failed to parse {}", file_path.display()))?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn normalize(&mut self) {
        self.api_token = non_empty(self.api_token.take());
        self.clickhouse_user = non_empty(self.clickhouse_user.take());
        self.clickhouse_password = non_empty(self.clickhouse_password.take());
        self.log_dir = non_empty(self.log_dir.take());
        self.storage = self.storage.trim().to_ascii_lowercase();
        self.replace_policy = self.replace_policy.trim().to_ascii_lowercase();
        self.log_format = self.log_format.trim().to_ascii_lowercase();
        self.process_name = self.process_name.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.monitor_interval_seconds == 0 {
            return Err(anyhow!("monitor_interval_seconds must be greater than 0"));
        }
        if self.min_rapid_count < 2 {
            return Err(anyhow!("min_rapid_count must be at least 2"));
        }
        if self.risk_ceiling > 100 {
            return Err(anyhow!("risk_ceiling must not exceed 100"));
        }
        if self.risk_floor > self.risk_ceiling {
            return Err(anyhow!("risk_floor must not exceed risk_ceiling"));
        }
        if self.priority_medium_min > self.priority_high_min {
            return Err(anyhow!("priority_medium_min must not exceed priority_high_min"));
        }
        if StorageBackend::parse(&self.storage).is_none() {
            return Err(anyhow!("unknown storage '{}'", self.storage));
        }
        if ReplacePolicy::parse(&self.replace_policy).is_none() {
            return Err(anyhow!("unknown replace_policy '{}'", self.replace_policy));
        }
        if parse_log_format(&self.log_format).is_none() {
            return Err(anyhow!("unknown log_format '{}'", self.log_format));
        }
        if self.process_name.is_empty() {
            return Err(anyhow!("process_name must not be empty"));
        }
        for (key, value) in [
            ("clickhouse_database", &self.clickhouse_database),
            ("transactions_table", &self.transactions_table),
            ("checkpoint_table", &self.checkpoint_table),
            ("alerts_table", &self.alerts_table),
        ] {
            if !is_identifier(value) {
                return Err(anyhow!("{} must be a plain identifier, got '{}'", key, value));
            }
        }
        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        StorageBackend::parse(&self.storage).unwrap_or(StorageBackend::Clickhouse)
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.log_level.clone(),
            format: parse_log_format(&self.log_format).unwrap_or(LogFormat::Text),
            dir: self.log_dir.clone(),
        }
    }

    pub fn to_detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            rapid_threshold_minutes: self.rapid_threshold_minutes,
            min_rapid_count: self.min_rapid_count,
            lookback_hours: self.lookback_hours,
            risk_multiplier: self.risk_multiplier,
            risk_floor: self.risk_floor,
            risk_ceiling: self.risk_ceiling,
            priority_high_min: self.priority_high_min,
            priority_medium_min: self.priority_medium_min,
        }
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            process_name: self.process_name.clone(),
            monitor_enabled: self.monitor_enabled,
            monitor_interval_seconds: self.monitor_interval_seconds,
            summary_every_ticks: self.summary_every_ticks,
            replace_policy: ReplacePolicy::parse(&self.replace_policy).unwrap_or_default(),
            stale_processing_seconds: self.stale_processing_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
            detection: self.to_detection_config(),
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            clickhouse_url: self.clickhouse_url.clone(),
            clickhouse_database: self.clickhouse_database.clone(),
            clickhouse_user: self.clickhouse_user.clone(),
            clickhouse_password: self.clickhouse_password.clone(),
            transactions_table: self.transactions_table.clone(),
            checkpoint_table: self.checkpoint_table.clone(),
            alerts_table: self.alerts_table.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        override_string("SENTINEL_BIND_ADDR", &mut self.bind_addr);
        override_option("SENTINEL_API_TOKEN", &mut self.api_token);
        override_string("SENTINEL_STORAGE", &mut self.storage);
        override_string("SENTINEL_CLICKHOUSE_URL", &mut self.clickhouse_url);
        override_string("SENTINEL_CLICKHOUSE_DATABASE", &mut self.clickhouse_database);
        override_option("SENTINEL_CLICKHOUSE_USER", &mut self.clickhouse_user);
        override_option("SENTINEL_CLICKHOUSE_PASSWORD", &mut self.clickhouse_password);
        override_string("SENTINEL_TRANSACTIONS_TABLE", &mut self.transactions_table);
        override_string("SENTINEL_CHECKPOINT_TABLE", &mut self.checkpoint_table);
        override_string("SENTINEL_ALERTS_TABLE", &mut self.alerts_table);
        override_string("SENTINEL_PROCESS_NAME", &mut self.process_name);
        override_parsed("SENTINEL_MONITOR_ENABLED", &mut self.monitor_enabled);
        override_parsed("SENTINEL_MONITOR_INTERVAL_SECONDS", &mut self.monitor_interval_seconds);
        override_parsed("SENTINEL_SUMMARY_EVERY_TICKS", &mut self.summary_every_ticks);
        override_parsed("SENTINEL_RAPID_THRESHOLD_MINUTES", &mut self.rapid_threshold_minutes);
        override_parsed("SENTINEL_MIN_RAPID_COUNT", &mut self.min_rapid_count);
        override_parsed("SENTINEL_LOOKBACK_HOURS", &mut self.lookback_hours);
        override_parsed("SENTINEL_RISK_MULTIPLIER", &mut self.risk_multiplier);
        override_parsed("SENTINEL_RISK_FLOOR", &mut self.risk_floor);
        override_parsed("SENTINEL_RISK_CEILING", &mut self.risk_ceiling);
        override_parsed("SENTINEL_PRIORITY_HIGH_MIN", &mut self.priority_high_min);
        override_parsed("SENTINEL_PRIORITY_MEDIUM_MIN", &mut self.priority_medium_min);
        override_string("SENTINEL_REPLACE_POLICY", &mut self.replace_policy);
        override_parsed("SENTINEL_STALE_PROCESSING_SECONDS", &mut self.stale_processing_seconds);
        override_parsed("SENTINEL_REQUEST_TIMEOUT_SECONDS", &mut self.request_timeout_seconds);
        override_string("SENTINEL_LOG_LEVEL", &mut self.log_level);
        override_string("SENTINEL_LOG_FORMAT", &mut self.log_format);
        override_option("SENTINEL_LOG_DIR", &mut self.log_dir);
    }
}

fn override_string(key: &str, target: &mut String) {
    if let Ok(value) = env::var(key) {
        *target = value;
    }
}

fn override_option(key: &str, target: &mut Option<String>) {
    if let Ok(value) = env::var(key) {
        *target = Some(value);
    }
}

fn override_parsed<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = env::var(key) {
        match value.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("ignoring unparsable {}={}", key, value),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|item| !item.trim().is_empty())
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value {
        "text" | "" => Some(LogFormat::Text),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}
