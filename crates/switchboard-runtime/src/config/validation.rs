//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, ServiceConfig, SwitchboardConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchboardConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;

    if config.router.default_bot.trim().is_empty() {
        return Err(ConfigError::missing_field("router.default_bot"));
    }

    validate_services_config(&config.services)
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is 'file' but logging.file_path is not set",
        ));
    }
    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty target: {target:?}"
        )));
    }
    Ok(())
}

/// Validates all service configurations.
fn validate_services_config(services: &[ServiceConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for service in services {
        if service.name.trim().is_empty() {
            return Err(ConfigError::missing_field("services.name"));
        }
        if !seen.insert(service.name.as_str()) {
            return Err(ConfigError::DuplicateService(service.name.clone()));
        }
        validate_service_config(service)?;
    }

    Ok(())
}

/// Validates a single service and its bots.
fn validate_service_config(service: &ServiceConfig) -> ConfigResult<()> {
    if service.platform().trim().is_empty() {
        return Err(ConfigError::missing_field(format!(
            "services.{}.platform",
            service.name
        )));
    }

    let mut seen = HashSet::new();
    for bot in &service.bots {
        if bot.name.trim().is_empty() {
            return Err(ConfigError::missing_field(format!(
                "services.{}.bots.name",
                service.name
            )));
        }
        if !seen.insert(bot.name.as_str()) {
            return Err(ConfigError::DuplicateBot {
                service: service.name.clone(),
                bot: bot.name.clone(),
            });
        }
        if bot.enabled && bot.token.trim().is_empty() {
            return Err(ConfigError::missing_field(format!(
                "services.{}.bots.{}.token",
                service.name, bot.name
            )));
        }
    }

    Ok(())
}
