//! Configuration module
//!
//! Application settings loaded from TOML files and environment variables

pub mod settings;
pub mod validation;

pub use settings::{
    Settings, ShopConfig, ChannelConfig, MenuConfig, PaymentConfig,
    DatabaseConfig, RedisConfig, DispatchConfig, ServerConfig, LoggingConfig,
};
