//! Config validation CLI tool
//!
//! Validates a wardend configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use warden_config::NotifierConfig;
use warden_util::default_config_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a wardend configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match warden_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", warden_config::CURRENT_CONFIG_VERSION);
            println!("  Listen address: {}", policy.service.listen_addr);
            println!("  Confirmation links: {}/confirm", policy.service.public_base_url);
            println!(
                "  Token validity: {}",
                warden_util::format_duration(
                    policy.confirmation_validity.to_std().unwrap_or_default()
                )
            );
            println!(
                "  Window: {:02}:{:02} to {:02}:59 (UTC{:+} min), reminders every {} min",
                policy.window.start_hour(),
                policy.window.phase_minute(),
                policy.window.end_hour(),
                policy.window.utc_offset_minutes(),
                policy.reminder_interval.num_minutes()
            );

            let notifier = match &policy.notifier {
                NotifierConfig::Log => "log".to_string(),
                NotifierConfig::Webhook { url, .. } => format!("webhook ({})", url),
            };
            println!("  Notifier: {}", notifier);

            if !policy.controller.commands.is_empty() {
                println!();
                println!("Controller commands:");
                let mut types: Vec<_> = policy.controller.commands.iter().collect();
                types.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
                for (resource_type, commands) in types {
                    let mut configured = Vec::new();
                    if commands.stop.is_some() {
                        configured.push("stop");
                    }
                    if commands.delete.is_some() {
                        configured.push("delete");
                    }
                    if commands.is_empty.is_some() {
                        configured.push("is_empty");
                    }
                    println!(
                        "  - {} [{}]: {}",
                        resource_type.as_str(),
                        resource_type.display_name(),
                        configured.join(", ")
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                warden_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                warden_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                warden_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                warden_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        warden_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
