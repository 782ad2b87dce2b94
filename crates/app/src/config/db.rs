//! Database Config

use clap::Args;

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Apply pending migrations before running the command
    #[arg(long, env = "RUN_MIGRATIONS", global = true, default_value_t = false)]
    pub migrate: bool,
}
