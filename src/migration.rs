//! Bring the database in line with the schema: CREATE TABLE for new entities, ADD COLUMN for
//! new properties. Tables and columns are never dropped, renamed, or retyped.

use crate::config::{EntityMeta, PropertyDef, PropertyKind, SchemaModel, CREATED_AT, ID_COLUMN, UPDATED_AT};
use crate::error::AppError;
use crate::sql::quoted;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Tables touched by one `migrate` run. Both empty when the schema was already in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: Vec<String>,
    pub altered: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.altered.is_empty()
    }
}

fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// ` DEFAULT …` suffix for a column, or empty when no default is declared.
pub fn column_default(prop: &PropertyDef) -> String {
    let Some(default) = &prop.default else {
        return String::new();
    };
    let literal = match (prop.kind, default) {
        (PropertyKind::Boolean, v) => {
            let truthy = match v {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Null => false,
                Value::Array(_) | Value::Object(_) => true,
            };
            let flag = if truthy { "1" } else { "0" };
            flag.to_string()
        }
        (_, Value::Null) => "NULL".to_string(),
        (_, Value::Number(n)) => n.to_string(),
        (_, Value::String(s)) => sql_literal(s),
        (_, other) => sql_literal(&other.to_string()),
    };
    format!(" DEFAULT {}", literal)
}

fn column_def(prop: &PropertyDef) -> String {
    format!(
        "{} {}{}",
        quoted(&prop.name),
        prop.kind.sql_type(),
        column_default(prop)
    )
}

/// DDL for a table that does not exist yet: CREATE TABLE plus, for pivots, the unique index
/// over all relation columns.
pub fn create_table_statements(entity: &EntityMeta) -> Vec<String> {
    let mut col_defs = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted(ID_COLUMN))];
    col_defs.extend(entity.properties.iter().map(column_def));
    if !entity.pivot {
        col_defs.push(format!("{} TEXT", quoted(CREATED_AT)));
        col_defs.push(format!("{} TEXT", quoted(UPDATED_AT)));
    }

    let mut statements = vec![format!(
        "CREATE TABLE {} (\n  {}\n)",
        quoted(&entity.table_name),
        col_defs.join(",\n  ")
    )];

    if entity.pivot {
        let relation_cols: Vec<String> = entity
            .properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Relation)
            .map(|p| quoted(&p.name))
            .collect();
        if !relation_cols.is_empty() {
            statements.push(format!(
                "CREATE UNIQUE INDEX {} ON {} ({})",
                quoted(&format!("idx_{}_unique", entity.table_name)),
                quoted(&entity.table_name),
                relation_cols.join(", ")
            ));
        }
    }
    statements
}

/// ADD COLUMN statements for declared columns missing from `existing`.
pub fn add_column_statements(entity: &EntityMeta, existing: &HashSet<String>) -> Vec<String> {
    let table = quoted(&entity.table_name);
    let mut statements: Vec<String> = entity
        .properties
        .iter()
        .filter(|p| !existing.contains(&p.name))
        .map(|p| format!("ALTER TABLE {} ADD COLUMN {}", table, column_def(p)))
        .collect();
    if !entity.pivot {
        for ts in [CREATED_AT, UPDATED_AT] {
            if !existing.contains(ts) {
                statements.push(format!("ALTER TABLE {} ADD COLUMN {} TEXT", table, quoted(ts)));
            }
        }
    }
    statements
}

async fn existing_tables(pool: &SqlitePool) -> Result<HashSet<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().collect())
}

async fn existing_columns(pool: &SqlitePool, table: &str) -> Result<HashSet<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().collect())
}

async fn execute_all(pool: &SqlitePool, statements: &[String]) -> Result<(), AppError> {
    for sql in statements {
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}

/// Create missing tables and add missing columns. Safe to run on every startup; a second run
/// against an unchanged schema issues no DDL. Any DDL failure is returned as-is.
pub async fn migrate(pool: &SqlitePool, model: &SchemaModel) -> Result<MigrationReport, AppError> {
    let tables = existing_tables(pool).await?;
    let mut report = MigrationReport::default();

    for entity in model.metas() {
        if tables.contains(&entity.table_name) {
            let columns = existing_columns(pool, &entity.table_name).await?;
            let statements = add_column_statements(entity, &columns);
            if statements.is_empty() {
                continue;
            }
            execute_all(pool, &statements).await?;
            tracing::info!(table = %entity.table_name, columns = statements.len(), "altered table");
            report.altered.push(entity.table_name.clone());
        } else {
            execute_all(pool, &create_table_statements(entity)).await?;
            tracing::info!(table = %entity.table_name, "created table");
            report.created.push(entity.table_name.clone());
        }
    }

    Ok(report)
}
