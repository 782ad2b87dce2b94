//! Application configuration module

use clap::Args;

pub mod db;
pub mod engine;
pub mod observability;

pub use db::DatabaseConfig;
pub use engine::EngineConfig;
pub use observability::{LogFormat, LoggingConfig};

/// Settings shared by every `coupons` command.
#[derive(Debug, Args)]
pub struct AppConfig {
    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Coupon engine settings.
    #[command(flatten)]
    pub engine: EngineConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,
}
