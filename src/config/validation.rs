//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{ChowBuddyError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_channel_config(&settings.channel)?;
    validate_menu_config(&settings.menu)?;
    validate_payment_config(&settings.payment)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_dispatch_config(&settings.dispatch)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate messaging channel configuration
fn validate_channel_config(config: &super::ChannelConfig) -> Result<()> {
    if config.access_token.is_empty() {
        return Err(ChowBuddyError::Config(
            "Channel access token is required".to_string()
        ));
    }

    if config.phone_number_id.is_empty() {
        return Err(ChowBuddyError::Config(
            "Channel phone number id is required".to_string()
        ));
    }

    if config.app_secret.is_empty() {
        return Err(ChowBuddyError::Config(
            "Channel app secret is required for webhook signature verification".to_string()
        ));
    }

    if config.send_retries == 0 {
        return Err(ChowBuddyError::Config(
            "Send retries must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate menu lookup configuration
fn validate_menu_config(config: &super::MenuConfig) -> Result<()> {
    if config.api_url.is_empty() {
        return Err(ChowBuddyError::Config(
            "Menu API URL is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(ChowBuddyError::Config(
            "Menu timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate payment gateway configuration
fn validate_payment_config(config: &super::PaymentConfig) -> Result<()> {
    if config.secret_key.is_empty() {
        return Err(ChowBuddyError::Config(
            "Payment gateway secret key is required".to_string()
        ));
    }

    if config.pending_timeout_minutes <= 0 {
        return Err(ChowBuddyError::Config(
            "Payment pending timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(ChowBuddyError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(ChowBuddyError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(ChowBuddyError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(ChowBuddyError::Config(
            "Redis URL is required".to_string()
        ));
    }

    Ok(())
}

/// Validate dispatcher configuration
fn validate_dispatch_config(config: &super::DispatchConfig) -> Result<()> {
    if config.dedup_window_minutes <= 0 {
        return Err(ChowBuddyError::Config(
            "Dedup window must be greater than 0".to_string()
        ));
    }

    if config.cas_retries == 0 {
        return Err(ChowBuddyError::Config(
            "CAS retry count must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(ChowBuddyError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(ChowBuddyError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.channel.access_token = "token".to_string();
        settings.channel.phone_number_id = "12345".to_string();
        settings.channel.app_secret = "secret".to_string();
        settings.payment.secret_key = "sk_test".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_access_token_rejected() {
        let mut settings = valid_settings();
        settings.channel.access_token = String::new();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_dedup_window_rejected() {
        let mut settings = valid_settings();
        settings.dispatch.dedup_window_minutes = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
