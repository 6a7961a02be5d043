//! Process configuration, read once at bootstrap. See `spec.md` §3 / §6.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default period (ms) requested in the E2SM-KPM event trigger definition.
pub const DEFAULT_REPORT_PERIOD_MS: i64 = 13;
pub const DEFAULT_REQUEST_ID: i64 = 1001;
pub const DEFAULT_FUNC_ID: i64 = 0;
pub const DEFAULT_INITIAL_SUB_ID: i64 = 1001;
pub const DEFAULT_RIC_STYLE_TYPE: i64 = 0;
pub const DEFAULT_ACTION_ID: i64 = 1;

#[derive(Debug, Clone)]
pub struct Config {
    /// RAN node names to subscribe to at startup, from `RAN_LIST`
    /// (comma-separated).
    pub ran_list: Vec<String>,
    /// Address of the key-value store, from `KVSTORE_ADDR`. The core never
    /// dials this itself (the `KvStore` implementation is injected) but
    /// carries it through for that implementation to use.
    pub kvstore_addr: String,
    /// Optional log4rs config file path, from `KPIMON_LOG_FILE`. Falls back
    /// to console-only logging when unset.
    pub log_config_file: Option<String>,
    pub event_create_expiry: Duration,
    pub event_delete_expiry: Duration,
    pub subscription_retry_interval: Duration,
    pub max_subscription_attempts: u32,
}

impl Config {
    /// Reads `RAN_LIST`, `KVSTORE_ADDR`, `KPIMON_LOG_FILE`; everything else
    /// is a fixed default matching the original's hardcoded values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ran_list: Vec<String> = env::var("RAN_LIST")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if ran_list.is_empty() {
            return Err(ConfigError::EmptyRanList);
        }

        let kvstore_addr = env::var("KVSTORE_ADDR").unwrap_or_else(|_| "127.0.0.1:6379".to_owned());
        let log_config_file = env::var("KPIMON_LOG_FILE").ok();

        Ok(Config {
            ran_list,
            kvstore_addr,
            log_config_file,
            event_create_expiry: Duration::from_secs(5),
            event_delete_expiry: Duration::from_secs(5),
            subscription_retry_interval: Duration::from_secs(5),
            max_subscription_attempts: 3,
        })
    }
}
