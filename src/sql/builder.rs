//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from entity metadata.
//! Identifiers are written only after passing the entity's column allow-list; values are
//! always `?` parameters.

use crate::config::{EntityMeta, ID_COLUMN};
use serde_json::Value;

/// Quote identifier for SQLite.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Like(Value),
    Gt(Value),
    Lt(Value),
    Gte(Value),
    Lte(Value),
    IsNull,
    NotNull,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub descending: bool,
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

fn select_column_list(entity: &EntityMeta) -> String {
    entity
        .column_names()
        .into_iter()
        .map(quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

/// WHERE clause for allow-listed filters; params are appended to `q` in clause order.
fn where_clause(entity: &EntityMeta, filters: &[Filter], q: &mut QueryBuf) -> String {
    let mut parts = Vec::new();
    for f in filters {
        if !entity.is_column(&f.column) {
            continue;
        }
        let col = quoted(&f.column);
        let (op, val) = match &f.op {
            FilterOp::Eq(v) => ("=", v),
            FilterOp::Like(v) => ("LIKE", v),
            FilterOp::Gt(v) => (">", v),
            FilterOp::Lt(v) => ("<", v),
            FilterOp::Gte(v) => (">=", v),
            FilterOp::Lte(v) => ("<=", v),
            FilterOp::IsNull => {
                parts.push(format!("{} IS NULL", col));
                continue;
            }
            FilterOp::NotNull => {
                parts.push(format!("{} IS NOT NULL", col));
                continue;
            }
        };
        q.push_param(val.clone());
        parts.push(format!("{} {} ?", col, op));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// ORDER BY clause; falls back to `id ASC` unless the sort column is allow-listed.
fn order_clause(entity: &EntityMeta, sort: Option<&Sort>) -> String {
    match sort {
        Some(s) if entity.is_column(&s.column) => format!(
            " ORDER BY {} {}",
            quoted(&s.column),
            if s.descending { "DESC" } else { "ASC" }
        ),
        _ => format!(" ORDER BY {} ASC", quoted(ID_COLUMN)),
    }
}

/// SELECT by primary key.
pub fn select_by_id(entity: &EntityMeta, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_column_list(entity),
        quoted(&entity.table_name),
        quoted(ID_COLUMN)
    );
    q
}

/// `SELECT 1` point lookup used for existence checks.
pub fn exists_by_id(entity: &EntityMeta, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id.clone());
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} = ?",
        quoted(&entity.table_name),
        quoted(ID_COLUMN)
    );
    q
}

/// COUNT(*) with the same WHERE clause as `select_page`.
pub fn count(entity: &EntityMeta, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(entity, filters, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&entity.table_name), where_sql);
    q
}

/// One page of rows: filtered, ordered, LIMIT/OFFSET bound as parameters.
pub fn select_page(
    entity: &EntityMeta,
    filters: &[Filter],
    sort: Option<&Sort>,
    limit: u32,
    offset: u64,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(entity, filters, &mut q);
    let order_sql = order_clause(entity, sort);
    q.push_param(Value::from(limit));
    q.push_param(Value::from(offset));
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
        select_column_list(entity),
        quoted(&entity.table_name),
        where_sql,
        order_sql
    );
    q
}

/// SELECT rows where column IN (...). Used for batch-loading related rows.
pub fn select_by_column_in(entity: &EntityMeta, column: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let cols = select_column_list(entity);
    if values.is_empty() || !entity.is_column(column) {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    for v in values {
        q.push_param(v.clone());
    }
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(column),
        placeholders,
        quoted(ID_COLUMN)
    );
    q
}

/// INSERT of already-coerced values. Columns not on the allow-list (and `id`) are skipped;
/// with nothing left the row is inserted with DEFAULT VALUES.
pub fn insert(entity: &EntityMeta, row: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&entity.table_name);
    let mut cols = Vec::new();
    for (name, val) in row {
        if name == ID_COLUMN || !entity.is_column(name) {
            continue;
        }
        cols.push(quoted(name));
        q.push_param(val.clone());
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            vec!["?"; cols.len()].join(", ")
        )
    };
    q
}

/// UPDATE by id. Returns `None` when no allow-listed column is left to set.
pub fn update(entity: &EntityMeta, id: i64, sets: &[(String, Value)]) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut parts = Vec::new();
    for (name, val) in sets {
        if name == ID_COLUMN || !entity.is_column(name) {
            continue;
        }
        parts.push(format!("{} = ?", quoted(name)));
        q.push_param(val.clone());
    }
    if parts.is_empty() {
        return None;
    }
    q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quoted(&entity.table_name),
        parts.join(", "),
        quoted(ID_COLUMN)
    );
    Some(q)
}

/// DELETE by id.
pub fn delete(entity: &EntityMeta, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quoted(&entity.table_name),
        quoted(ID_COLUMN)
    );
    q
}
