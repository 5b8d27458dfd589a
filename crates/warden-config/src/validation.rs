//! Configuration validation

use crate::schema::{RawCommandSet, RawConfig, RawEnforcementConfig, RawNotifierConfig};
use thiserror::Error;
use warden_api::ResourceType;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    FieldError {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Enforcement window: {0}")]
    InvalidWindow(String),

    #[error("Unknown resource type in [controller.commands]: {0}")]
    UnknownResourceType(String),

    #[error("Command '{command}' for '{resource_type}': {message}")]
    CommandError {
        resource_type: String,
        command: &'static str,
        message: String,
    },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(addr) = &config.service.listen_addr
        && addr.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::FieldError {
            section: "service",
            field: "listen_addr",
            message: format!("'{}' is not a socket address", addr),
        });
    }

    if let Some(base) = &config.service.public_base_url
        && let Err(e) = url::Url::parse(base)
    {
        errors.push(ValidationError::FieldError {
            section: "service",
            field: "public_base_url",
            message: e.to_string(),
        });
    }

    if let Some(seconds) = config.service.tick_interval_seconds
        && !(1..=crate::MAX_TICK_INTERVAL_SECONDS).contains(&seconds)
    {
        errors.push(ValidationError::FieldError {
            section: "service",
            field: "tick_interval_seconds",
            message: format!(
                "must be between 1 and {}, got {}",
                crate::MAX_TICK_INTERVAL_SECONDS,
                seconds
            ),
        });
    }

    if let Some(hours) = config.confirmation.validity_hours
        && !(hours.is_finite() && hours > 0.0 && hours <= crate::MAX_VALIDITY_HOURS)
    {
        errors.push(ValidationError::FieldError {
            section: "confirmation",
            field: "validity_hours",
            message: format!(
                "must be a positive number of hours up to {}, got {}",
                crate::MAX_VALIDITY_HOURS,
                hours
            ),
        });
    }

    errors.extend(validate_enforcement(&config.enforcement));

    match &config.notifier {
        RawNotifierConfig::Log => {}
        RawNotifierConfig::Webhook { url, timeout_seconds } => {
            match url {
                None => errors.push(ValidationError::FieldError {
                    section: "notifier",
                    field: "url",
                    message: "required for webhook notifier".into(),
                }),
                Some(url) => {
                    if let Err(e) = url::Url::parse(url) {
                        errors.push(ValidationError::FieldError {
                            section: "notifier",
                            field: "url",
                            message: e.to_string(),
                        });
                    }
                }
            }
            if *timeout_seconds == Some(0) {
                errors.push(ValidationError::FieldError {
                    section: "notifier",
                    field: "timeout_seconds",
                    message: "must be positive".into(),
                });
            }
        }
    }

    if config.controller.timeout_seconds == Some(0) {
        errors.push(ValidationError::FieldError {
            section: "controller",
            field: "timeout_seconds",
            message: "must be positive".into(),
        });
    }

    for (tag, commands) in &config.controller.commands {
        if !ResourceType::parse(tag).is_supported() {
            errors.push(ValidationError::UnknownResourceType(tag.clone()));
            continue;
        }
        errors.extend(validate_commands(tag, commands));
    }

    errors
}

fn validate_enforcement(raw: &RawEnforcementConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let start = raw.start_hour.unwrap_or(crate::DEFAULT_START_HOUR);
    let end = raw.end_hour.unwrap_or(crate::DEFAULT_END_HOUR);

    if start >= 24 {
        errors.push(ValidationError::InvalidWindow(format!(
            "start_hour {} is not an hour of the day",
            start
        )));
    }
    if end >= 24 {
        errors.push(ValidationError::InvalidWindow(format!(
            "end_hour {} is not an hour of the day",
            end
        )));
    }
    if start < 24 && end < 24 && start > end {
        errors.push(ValidationError::InvalidWindow(format!(
            "start_hour {} is after end_hour {}",
            start, end
        )));
    }

    if let Some(phase) = raw.phase_minute
        && phase >= 60
    {
        errors.push(ValidationError::InvalidWindow(format!(
            "phase_minute {} must be below 60",
            phase
        )));
    }

    if let Some(offset) = raw.utc_offset_minutes
        && offset.unsigned_abs() >= 24 * 60
    {
        errors.push(ValidationError::InvalidWindow(format!(
            "utc_offset_minutes {} must be less than a day",
            offset
        )));
    }

    if let Some(minutes) = raw.reminder_interval_minutes
        && !(1..=crate::MAX_REMINDER_INTERVAL_MINUTES).contains(&minutes)
    {
        errors.push(ValidationError::FieldError {
            section: "enforcement",
            field: "reminder_interval_minutes",
            message: format!(
                "must be between 1 and {}, got {}",
                crate::MAX_REMINDER_INTERVAL_MINUTES,
                minutes
            ),
        });
    }

    errors
}

fn validate_commands(tag: &str, commands: &RawCommandSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let named = [
        ("stop", &commands.stop),
        ("delete", &commands.delete),
        ("is_empty", &commands.is_empty),
    ];

    for (command, argv) in named {
        if let Some(argv) = argv
            && argv.first().is_none_or(|program| program.trim().is_empty())
        {
            errors.push(ValidationError::CommandError {
                resource_type: tag.to_string(),
                command,
                message: "argv cannot be empty".into(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&raw("config_version = 1")).is_empty());
    }

    #[test]
    fn rejects_bad_hours() {
        let errors = validate_config(&raw(
            "config_version = 1\n[enforcement]\nstart_hour = 24\nend_hour = 25\n",
        ));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidWindow(_))));
    }

    #[test]
    fn rejects_inverted_window() {
        let errors = validate_config(&raw(
            "config_version = 1\n[enforcement]\nstart_hour = 16\nend_hour = 12\n",
        ));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn rejects_offset_of_a_day() {
        let errors = validate_config(&raw(
            "config_version = 1\n[enforcement]\nutc_offset_minutes = -1440\n",
        ));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn rejects_non_positive_validity() {
        for hours in ["0.0", "-1.5", "nan"] {
            let errors = validate_config(&raw(&format!(
                "config_version = 1\n[confirmation]\nvalidity_hours = {}\n",
                hours
            )));
            assert_eq!(errors.len(), 1, "validity_hours = {}", hours);
        }
    }

    #[test]
    fn rejects_validity_beyond_ten_years() {
        for hours in ["1e10", "87601", "inf"] {
            let errors = validate_config(&raw(&format!(
                "config_version = 1\n[confirmation]\nvalidity_hours = {}\n",
                hours
            )));
            assert!(
                matches!(&errors[..], [ValidationError::FieldError { field: "validity_hours", .. }]),
                "validity_hours = {}: {:?}",
                hours,
                errors
            );
        }

        let ten_years = validate_config(&raw("config_version = 1\n[confirmation]\nvalidity_hours = 87600\n"));
        assert!(ten_years.is_empty());
    }

    #[test]
    fn rejects_out_of_range_reminder_interval() {
        for minutes in ["0", "10081", "200000000000000000"] {
            let errors = validate_config(&raw(&format!(
                "config_version = 1\n[enforcement]\nreminder_interval_minutes = {}\n",
                minutes
            )));
            assert!(
                matches!(
                    &errors[..],
                    [ValidationError::FieldError { field: "reminder_interval_minutes", .. }]
                ),
                "reminder_interval_minutes = {}: {:?}",
                minutes,
                errors
            );
        }

        let one_week = validate_config(&raw(
            "config_version = 1\n[enforcement]\nreminder_interval_minutes = 10080\n",
        ));
        assert!(one_week.is_empty());
    }

    #[test]
    fn rejects_out_of_range_tick_interval() {
        for seconds in ["0", "86401"] {
            let errors = validate_config(&raw(&format!(
                "config_version = 1\n[service]\ntick_interval_seconds = {}\n",
                seconds
            )));
            assert_eq!(errors.len(), 1, "tick_interval_seconds = {}", seconds);
        }
    }

    #[test]
    fn rejects_unknown_command_table() {
        let errors = validate_config(&raw(
            "config_version = 1\n[controller.commands.dynamodb_table]\nstop = [\"true\"]\n",
        ));
        assert!(matches!(&errors[..], [ValidationError::UnknownResourceType(t)] if t == "dynamodb_table"));
    }

    #[test]
    fn rejects_empty_argv() {
        let errors = validate_config(&raw(
            "config_version = 1\n[controller.commands.function]\ndelete = []\nstop = [\" \"]\n",
        ));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_bad_urls() {
        let errors = validate_config(&raw(
            r#"
            config_version = 1
            [service]
            public_base_url = "not a url"
            [notifier]
            type = "webhook"
            url = "also not a url"
            "#,
        ));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let errors = validate_config(&raw(
            "config_version = 1\n[service]\nlisten_addr = \"localhost\"\n",
        ));
        assert_eq!(errors.len(), 1);
    }
}
