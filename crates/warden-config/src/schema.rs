//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Confirmation token settings
    #[serde(default)]
    pub confirmation: RawConfirmationConfig,

    /// Daily enforcement campaign
    #[serde(default)]
    pub enforcement: RawEnforcementConfig,

    /// Where notifications go
    #[serde(default)]
    pub notifier: RawNotifierConfig,

    /// How resources are stopped and deleted
    #[serde(default)]
    pub controller: RawControllerConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// HTTP listen address (default: 127.0.0.1:8080)
    pub listen_addr: Option<String>,

    /// Data directory for store
    pub data_dir: Option<PathBuf>,

    /// Prefix for confirmation links (default: http://<listen_addr>)
    pub public_base_url: Option<String>,

    /// Seconds between scheduler ticks (default: 60)
    pub tick_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfirmationConfig {
    /// Token validity, may be fractional (default: 1.0)
    pub validity_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEnforcementConfig {
    pub start_hour: Option<u8>,
    pub end_hour: Option<u8>,
    pub utc_offset_minutes: Option<i32>,
    pub phase_minute: Option<u8>,
    pub reminder_interval_minutes: Option<u64>,
}

/// Raw notifier selection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawNotifierConfig {
    /// Write notifications to the log
    #[default]
    Log,
    /// POST notifications as JSON
    Webhook {
        url: Option<String>,
        timeout_seconds: Option<u64>,
    },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawControllerConfig {
    /// Per-command timeout (default: 30)
    pub timeout_seconds: Option<u64>,

    /// Command templates keyed by resource type tag
    /// (`compute_instance`, `storage_bucket`, `function`, `managed_database`)
    #[serde(default)]
    pub commands: BTreeMap<String, RawCommandSet>,
}

/// Argv templates; `{id}` is replaced with the service id
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCommandSet {
    pub stop: Option<Vec<String>>,
    pub delete: Option<Vec<String>>,
    pub is_empty: Option<Vec<String>>,
}
