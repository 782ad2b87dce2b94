//! Coupon Engine Config

use std::time::Duration;

use clap::{Args, builder::TypedValueParser as _};

use crate::domain::coupons::{DEFAULT_MAX_CODES, EngineSettings};

/// Coupon engine settings.
#[derive(Debug, Clone, Copy, Args)]
pub struct EngineConfig {
    /// Maximum number of coupon codes accepted per order
    #[arg(
        long,
        env = "MAX_CODES",
        global = true,
        default_value_t = DEFAULT_MAX_CODES,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
    )]
    pub max_codes: usize,

    /// Bound on each coupon store round-trip, in milliseconds
    #[arg(
        long,
        env = "STORE_TIMEOUT_MS",
        global = true,
        default_value_t = 2_000_u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub store_timeout_ms: u64,
}

impl EngineConfig {
    #[must_use]
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            max_codes: self.max_codes,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }
}
