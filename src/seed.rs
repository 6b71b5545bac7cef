//! Initial rows from each entity's `seed` list, inserted only into empty tables.

use crate::config::{EntityMeta, SchemaModel};
use crate::error::AppError;
use crate::service::insert_values;
use crate::sql::{self, bind_params};
use sqlx::{Row, SqlitePool};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Rows inserted across all entities.
    pub seeded: usize,
}

async fn row_count(pool: &SqlitePool, entity: &EntityMeta) -> Result<i64, AppError> {
    let q = sql::count(entity, &[]);
    let row = bind_params(&q.sql, &q.params).fetch_one(pool).await?;
    Ok(row.try_get(0)?)
}

/// Seed rows are coerced like create input but not validated. Each entity is seeded in its
/// own transaction, so a failure leaves that table empty for the next startup to retry.
pub async fn seed(pool: &SqlitePool, model: &SchemaModel) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();
    for entity in model.metas() {
        if entity.seed.is_empty() {
            continue;
        }
        if row_count(pool, entity).await? > 0 {
            tracing::debug!(entity = %entity.entity_name, "table not empty; seed skipped");
            continue;
        }

        let mut tx = pool.begin().await?;
        for record in &entity.seed {
            let q = sql::insert(entity, &insert_values(entity, record));
            bind_params(&q.sql, &q.params).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::info!(entity = %entity.entity_name, rows = entity.seed.len(), "seeded");
        report.seeded += entity.seed.len();
    }
    Ok(report)
}
