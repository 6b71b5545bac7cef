//! Shared application state, built once at startup.

use crate::config::{load_from_path, resolve, SchemaModel};
use crate::error::AppError;
use crate::migration::migrate;
use crate::seed::seed;
use crate::service::CrudService;
use crate::store::{open_datastore, Settings};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Immutable after startup.
    pub model: Arc<SchemaModel>,
}

impl AppState {
    pub fn new(pool: SqlitePool, model: SchemaModel) -> Self {
        AppState {
            pool,
            model: Arc::new(model),
        }
    }

    /// Open the store, load and resolve the schema, migrate, then seed. Any failure aborts.
    pub async fn bootstrap(settings: &Settings) -> Result<Self, AppError> {
        let pool = open_datastore(&settings.database_path).await?;
        let config = load_from_path(&settings.schema_path).await?;
        let model = resolve(&config)?;
        Self::prepare(pool, model).await
    }

    /// Migrate and seed an already-open store against `model`.
    pub async fn prepare(pool: SqlitePool, model: SchemaModel) -> Result<Self, AppError> {
        let migrated = migrate(&pool, &model).await?;
        if !migrated.is_empty() {
            tracing::info!(created = ?migrated.created, altered = ?migrated.altered, "migration applied");
        }
        let seeded = seed(&pool, &model).await?;
        if seeded.seeded > 0 {
            tracing::info!(rows = seeded.seeded, "seed applied");
        }
        Ok(Self::new(pool, model))
    }

    /// One handler bundle per entity, in schema order.
    pub fn crud_services(&self) -> Vec<CrudService> {
        self.model
            .entities
            .iter()
            .map(|e| CrudService::new(self.pool.clone(), self.model.clone(), e.clone()))
            .collect()
    }
}
