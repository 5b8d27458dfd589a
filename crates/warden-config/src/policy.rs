//! Validated policy structures

use crate::schema::{
    RawCommandSet, RawConfig, RawControllerConfig, RawEnforcementConfig, RawNotifierConfig,
    RawServiceConfig,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use warden_api::ResourceType;
use warden_util::{EnforcementWindow, default_data_dir, hours_to_duration};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_TICK_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_VALIDITY_HOURS: f64 = 1.0;
pub const DEFAULT_START_HOUR: u8 = 12;
pub const DEFAULT_END_HOUR: u8 = 16;
pub const DEFAULT_PHASE_MINUTE: u8 = 30;
pub const DEFAULT_REMINDER_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_NOTIFIER_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CONTROLLER_TIMEOUT_SECONDS: u64 = 30;

/// Ten years
pub const MAX_VALIDITY_HOURS: f64 = 24.0 * 365.0 * 10.0;
/// One week
pub const MAX_REMINDER_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
/// One day
pub const MAX_TICK_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

/// Validated policy ready for use by the core
#[derive(Debug, Clone)]
pub struct Policy {
    pub service: ServiceConfig,

    /// How long a freshly issued token stays valid
    pub confirmation_validity: chrono::Duration,

    pub window: EnforcementWindow,

    /// Minimum gap between notifications to the same creator
    pub reminder_interval: chrono::Duration,

    pub notifier: NotifierConfig,

    pub controller: ControllerConfig,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let reminder_interval = raw
            .enforcement
            .reminder_interval_minutes
            .and_then(|minutes| i64::try_from(minutes).ok())
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or_else(default_reminder_interval);

        Self {
            confirmation_validity: hours_to_duration(
                raw.confirmation
                    .validity_hours
                    .unwrap_or(DEFAULT_VALIDITY_HOURS),
            ),
            window: window_from_raw(&raw.enforcement),
            reminder_interval,
            service: ServiceConfig::from_raw(raw.service),
            notifier: NotifierConfig::from_raw(raw.notifier),
            controller: ControllerConfig::from_raw(raw.controller),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            confirmation_validity: hours_to_duration(DEFAULT_VALIDITY_HOURS),
            window: EnforcementWindow::default(),
            reminder_interval: default_reminder_interval(),
            notifier: NotifierConfig::Log,
            controller: ControllerConfig::default(),
        }
    }
}

fn default_reminder_interval() -> chrono::Duration {
    chrono::Duration::minutes(DEFAULT_REMINDER_INTERVAL_MINUTES as i64)
}

fn window_from_raw(raw: &RawEnforcementConfig) -> EnforcementWindow {
    EnforcementWindow::new(
        raw.start_hour.unwrap_or(DEFAULT_START_HOUR),
        raw.end_hour.unwrap_or(DEFAULT_END_HOUR),
        raw.phase_minute.unwrap_or(DEFAULT_PHASE_MINUTE),
        raw.utc_offset_minutes.unwrap_or(0),
    )
    // Only reachable for unvalidated input
    .unwrap_or_default()
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: String,
    pub data_dir: PathBuf,
    /// Confirmation links are built as `{public_base_url}/confirm?..`;
    /// stored without a trailing slash
    pub public_base_url: String,
    pub tick_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let listen_addr = raw
            .listen_addr
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let public_base_url = raw
            .public_base_url
            .unwrap_or_else(|| format!("http://{}", listen_addr))
            .trim_end_matches('/')
            .to_string();

        Self {
            public_base_url,
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            tick_interval: Duration::from_secs(
                raw.tick_interval_seconds
                    .unwrap_or(DEFAULT_TICK_INTERVAL_SECONDS),
            ),
            listen_addr,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Notifier selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierConfig {
    Log,
    Webhook { url: String, timeout: Duration },
}

impl NotifierConfig {
    fn from_raw(raw: RawNotifierConfig) -> Self {
        match raw {
            RawNotifierConfig::Log => NotifierConfig::Log,
            RawNotifierConfig::Webhook {
                url: Some(url),
                timeout_seconds,
            } => NotifierConfig::Webhook {
                url,
                timeout: Duration::from_secs(
                    timeout_seconds.unwrap_or(DEFAULT_NOTIFIER_TIMEOUT_SECONDS),
                ),
            },
            // Validation rejects a webhook without a url
            RawNotifierConfig::Webhook { url: None, .. } => NotifierConfig::Log,
        }
    }
}

/// Argv templates for one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    pub stop: Option<Vec<String>>,
    pub delete: Option<Vec<String>>,
    pub is_empty: Option<Vec<String>>,
}

impl From<RawCommandSet> for CommandSet {
    fn from(raw: RawCommandSet) -> Self {
        Self {
            stop: raw.stop,
            delete: raw.delete,
            is_empty: raw.is_empty,
        }
    }
}

/// Resource controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub timeout: Duration,
    pub commands: HashMap<ResourceType, CommandSet>,
}

impl ControllerConfig {
    fn from_raw(raw: RawControllerConfig) -> Self {
        let commands = raw
            .commands
            .into_iter()
            .map(|(tag, set)| (ResourceType::parse(&tag), CommandSet::from(set)))
            .filter(|(resource_type, _)| resource_type.is_supported())
            .collect();

        Self {
            timeout: Duration::from_secs(
                raw.timeout_seconds
                    .unwrap_or(DEFAULT_CONTROLLER_TIMEOUT_SECONDS),
            ),
            commands,
        }
    }

    pub fn commands_for(&self, resource_type: &ResourceType) -> Option<&CommandSet> {
        self.commands.get(resource_type)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_raw(RawControllerConfig::default())
    }
}
