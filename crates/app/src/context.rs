//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::AppConfig,
    database::{self, Db},
    domain::coupons::{CouponsEngine, CouponsService, EngineSettings, postgres::PgCouponStore},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("no database configured, set DATABASE_URL or pass --database-url")]
    MissingDatabaseUrl,

    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to run database migrations")]
    Migrations(#[source] sqlx::migrate::MigrateError),
}

#[derive(Clone)]
pub struct AppContext {
    pub coupons: Arc<dyn CouponsService>,
    pub store: PgCouponStore,
}

impl AppContext {
    /// Build application context from the shared command configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when no database URL is configured, the connection
    /// fails, or requested migrations fail.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let url = config
            .database
            .database_url
            .as_deref()
            .ok_or(AppInitError::MissingDatabaseUrl)?;

        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        if config.database.migrate {
            database::migrate(&pool)
                .await
                .map_err(AppInitError::Migrations)?;
        }

        Ok(Self::from_db(Db::new(pool), config.engine.settings()))
    }

    /// Wire the engine over a PostgreSQL-backed store.
    #[must_use]
    pub fn from_db(db: Db, settings: EngineSettings) -> Self {
        let store = PgCouponStore::new(db);
        let shared = Arc::new(store.clone());

        Self {
            coupons: Arc::new(CouponsEngine::new(shared.clone(), shared, settings)),
            store,
        }
    }
}
