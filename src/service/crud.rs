//! Generic CRUD execution against SQLite, one service per entity.

use crate::config::{EntityMeta, PropertyKind, SchemaModel, CREATED_AT, ID_COLUMN, UPDATED_AT};
use crate::error::AppError;
use crate::response::PageMeta;
use crate::service::query::ListQuery;
use crate::service::RequestValidator;
use crate::sql::{self, bind_params, QueryBuf};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One page of list results.
#[derive(Clone, Debug)]
pub struct Page {
    pub data: Vec<Value>,
    pub meta: PageMeta,
}

/// RFC 3339 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Column/value pairs for a new row: present properties coerced, unset uuid properties
/// generated, timestamps stamped. Absent properties are left to the column default.
pub fn insert_values(entity: &EntityMeta, body: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut row = Vec::with_capacity(entity.properties.len() + 2);
    for prop in &entity.properties {
        match body.get(&prop.name) {
            Some(v) => row.push((prop.name.clone(), prop.kind.coerce(v))),
            None if prop.kind == PropertyKind::Uuid => row.push((
                prop.name.clone(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            )),
            None => {}
        }
    }
    if !entity.pivot {
        let now = Value::String(now_timestamp());
        row.push((CREATED_AT.to_string(), now.clone()));
        row.push((UPDATED_AT.to_string(), now));
    }
    row
}

/// Handler bundle for one entity: its metadata plus the shared pool and model.
#[derive(Clone)]
pub struct CrudService {
    pool: SqlitePool,
    model: Arc<SchemaModel>,
    entity: Arc<EntityMeta>,
}

impl CrudService {
    pub fn new(pool: SqlitePool, model: Arc<SchemaModel>, entity: Arc<EntityMeta>) -> Self {
        CrudService {
            pool,
            model,
            entity,
        }
    }

    pub fn entity(&self) -> &EntityMeta {
        &self.entity
    }

    /// Filtered, sorted page of rows plus total count. `with` relations are attached.
    pub async fn list(&self, query: &ListQuery) -> Result<Page, AppError> {
        let entity = &self.entity;
        let q = sql::count(entity, &query.filters);
        let row = bind_params(&q.sql, &q.params).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get(0)?;

        let q = sql::select_page(
            entity,
            &query.filters,
            query.sort.as_ref(),
            query.per_page,
            query.offset(),
        );
        let mut data = self.fetch_all(&q).await?;
        if !data.is_empty() {
            self.eager_load(&mut data, &query.with).await?;
        }

        let per_page = i64::from(query.per_page);
        let last_page = ((total + per_page - 1) / per_page).max(1);
        Ok(Page {
            data,
            meta: PageMeta {
                total,
                page: query.page,
                per_page: query.per_page,
                last_page,
            },
        })
    }

    /// Fetch one row by primary key.
    pub async fn get(&self, id: i64, with: &[String]) -> Result<Value, AppError> {
        let row = self.require(id).await?;
        let mut rows = vec![row];
        self.eager_load(&mut rows, with).await?;
        Ok(rows.pop().unwrap_or(Value::Null))
    }

    /// Validate, insert, and return the stored row.
    pub async fn create(&self, body: &Map<String, Value>) -> Result<Value, AppError> {
        RequestValidator::validate(&self.pool, &self.model, &self.entity, body, false).await?;
        let q = sql::insert(&self.entity, &insert_values(&self.entity, body));
        let done = bind_params(&q.sql, &q.params)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(&self.entity, e))?;
        let id = done.last_insert_rowid();
        tracing::debug!(entity = %self.entity.entity_name, id, "created");
        self.require(id).await
    }

    /// Full update: absent properties fall back to their default, then to NULL when nullable,
    /// else stay as they are. Uuid properties are only written when supplied.
    pub async fn replace(&self, id: i64, body: &Map<String, Value>) -> Result<Value, AppError> {
        let existing = self.require(id).await?;
        RequestValidator::validate(&self.pool, &self.model, &self.entity, body, true).await?;

        let mut sets = Vec::new();
        for prop in &self.entity.properties {
            let value = match body.get(&prop.name) {
                Some(v) => prop.kind.coerce(v),
                None if prop.kind == PropertyKind::Uuid => continue,
                None => match &prop.default {
                    Some(d) => prop.kind.coerce(d),
                    None if prop.nullable => Value::Null,
                    None => continue,
                },
            };
            sets.push((prop.name.clone(), value));
        }
        if sets.is_empty() {
            return Ok(existing);
        }
        self.apply_update(id, sets).await
    }

    /// Partial update of the supplied properties only.
    pub async fn patch(&self, id: i64, body: &Map<String, Value>) -> Result<Value, AppError> {
        self.require(id).await?;
        RequestValidator::validate(&self.pool, &self.model, &self.entity, body, true).await?;

        let sets: Vec<(String, Value)> = self
            .entity
            .properties
            .iter()
            .filter(|p| ![ID_COLUMN, CREATED_AT, UPDATED_AT].contains(&p.name.as_str()))
            .filter_map(|p| body.get(&p.name).map(|v| (p.name.clone(), p.kind.coerce(v))))
            .collect();
        if sets.is_empty() {
            return Err(AppError::BadRequest("No valid fields to update".into()));
        }
        self.apply_update(id, sets).await
    }

    /// Remove the row; returns `{ "id": id }`.
    pub async fn delete(&self, id: i64) -> Result<Value, AppError> {
        self.require(id).await?;
        let q = sql::delete(&self.entity, id);
        bind_params(&q.sql, &q.params).execute(&self.pool).await?;
        tracing::debug!(entity = %self.entity.entity_name, id, "deleted");
        Ok(serde_json::json!({ "id": id }))
    }

    async fn apply_update(&self, id: i64, mut sets: Vec<(String, Value)>) -> Result<Value, AppError> {
        if !self.entity.pivot {
            sets.push((UPDATED_AT.to_string(), Value::String(now_timestamp())));
        }
        if let Some(q) = sql::update(&self.entity, id, &sets) {
            bind_params(&q.sql, &q.params)
                .execute(&self.pool)
                .await
                .map_err(|e| write_error(&self.entity, e))?;
        }
        self.require(id).await
    }

    async fn require(&self, id: i64) -> Result<Value, AppError> {
        let q = sql::select_by_id(&self.entity, id);
        let row = bind_params(&q.sql, &q.params).fetch_optional(&self.pool).await?;
        row.map(|r| row_to_json(&self.entity, &r))
            .ok_or_else(|| AppError::NotFound(format!("{} {}", self.entity.entity_name, id)))
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        fetch_rows(&self.pool, &self.entity, q).await
    }

    /// Attach related records named in `with`: one IN query per relation, `null` when the
    /// foreign key is unset or dangling. Unknown names are skipped.
    async fn eager_load(&self, rows: &mut [Value], with: &[String]) -> Result<(), AppError> {
        for name in with {
            let Some(rel) = self.entity.relation_by_short_name(name) else {
                continue;
            };
            let ids: BTreeSet<i64> = rows
                .iter()
                .filter_map(|r| r.get(&rel.property).and_then(Value::as_i64))
                .collect();

            let mut related: Vec<Value> = Vec::new();
            if !ids.is_empty() {
                if let Some(target) = self.model.entity_by_name(&rel.target_entity) {
                    let values: Vec<Value> = ids.iter().copied().map(Value::from).collect();
                    let q = sql::select_by_column_in(target, ID_COLUMN, &values);
                    related = fetch_rows(&self.pool, target, &q).await?;
                }
            }

            let short = rel.short_name().to_string();
            for row in rows.iter_mut() {
                let fk = row.get(&rel.property).and_then(Value::as_i64);
                let found = fk
                    .and_then(|fk| {
                        related
                            .iter()
                            .find(|r| r.get(ID_COLUMN).and_then(Value::as_i64) == Some(fk))
                    })
                    .cloned()
                    .unwrap_or(Value::Null);
                if let Value::Object(map) = row {
                    map.insert(short.clone(), found);
                }
            }
        }
        Ok(())
    }
}

/// Unique index violations become a 409 without the driver text.
fn write_error(entity: &EntityMeta, e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            tracing::debug!(entity = %entity.entity_name, error = %db, "unique violation");
            AppError::Conflict(format!("{} already exists", entity.entity_name))
        }
        _ => AppError::Db(e),
    }
}

async fn fetch_rows(pool: &SqlitePool, entity: &EntityMeta, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
    let rows = bind_params(&q.sql, &q.params).fetch_all(pool).await?;
    Ok(rows.iter().map(|r| row_to_json(entity, r)).collect())
}

/// Row to JSON object, decoding each declared property by kind.
pub fn row_to_json(entity: &EntityMeta, row: &SqliteRow) -> Value {
    use sqlx::Column;
    let mut map = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let name = col.name();
        let raw = cell_to_value(row, idx);
        let v = match entity.property(name) {
            Some(p) => p.kind.decode(raw),
            None => raw,
        };
        map.insert(name.to_string(), v);
    }
    Value::Object(map)
}

fn cell_to_value(row: &SqliteRow, idx: usize) -> Value {
    use sqlx::ValueRef;
    match row.try_get_raw(idx) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }
    if let Ok(n) = row.try_get::<i64, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(n) = row.try_get::<f64, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(s) = row.try_get::<String, _>(idx) {
        return Value::String(s);
    }
    if let Ok(b) = row.try_get::<Vec<u8>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&b).into_owned());
    }
    Value::Null
}
