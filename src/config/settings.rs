//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub shop: ShopConfig,
    pub channel: ChannelConfig,
    pub menu: MenuConfig,
    pub payment: PaymentConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub dispatch: DispatchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Storefront branding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
    pub name: String,
    pub currency_symbol: String,
}

/// Messaging channel (WhatsApp Cloud style) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub api_url: String,
    pub phone_number_id: String,
    pub access_token: String,
    pub verify_token: String,
    pub app_secret: String,
    pub timeout_seconds: u64,
    pub send_retries: u32,
}

/// Menu lookup API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MenuConfig {
    pub api_url: String,
    pub timeout_seconds: u64,
}

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    pub api_url: String,
    pub secret_key: String,
    pub timeout_seconds: u64,
    /// Minutes an order may stay PENDING before the reconciliation
    /// sweep expires it
    pub pending_timeout_minutes: i64,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration (menu cache)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Event dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// How long a processed event id is remembered for dedup
    pub dedup_window_minutes: i64,
    /// Bounded retry count for compare-and-swap conflicts
    pub cas_retries: u32,
    /// Interval between payment reconciliation sweeps
    pub reconcile_interval_seconds: u64,
}

/// Webhook HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("CHOWBUDDY"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::ChowBuddyError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shop: ShopConfig {
                name: "ChowBuddy".to_string(),
                currency_symbol: "₦".to_string(),
            },
            channel: ChannelConfig {
                api_url: "https://graph.facebook.com/v18.0".to_string(),
                phone_number_id: String::new(),
                access_token: String::new(),
                verify_token: String::new(),
                app_secret: String::new(),
                timeout_seconds: 10,
                send_retries: 3,
            },
            menu: MenuConfig {
                api_url: "http://localhost:8090".to_string(),
                timeout_seconds: 5,
            },
            payment: PaymentConfig {
                api_url: "https://api.paystack.co".to_string(),
                secret_key: String::new(),
                timeout_seconds: 10,
                pending_timeout_minutes: 30,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/chowbuddy".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "chowbuddy:".to_string(),
                ttl_seconds: 300,
            },
            dispatch: DispatchConfig {
                dedup_window_minutes: 24 * 60,
                cas_retries: 3,
                reconcile_interval_seconds: 60,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/chowbuddy".to_string(),
            },
        }
    }
}
