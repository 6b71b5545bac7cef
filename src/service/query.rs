//! List query parameters: paging, sort, suffix filters, and `with`.

use crate::config::{EntityMeta, PropertyKind};
use crate::sql::{Filter, FilterOp, Sort};
use serde_json::Value;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

const RESERVED: [&str; 4] = ["page", "per_page", "sort", "with"];

/// Checked longest-first so `_gte` is never read as `_gt`.
const SUFFIXES: [&str; 6] = ["_like", "_gte", "_lte", "_gt", "_lt", "_null"];

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<Sort>,
    pub filters: Vec<Filter>,
    pub with: Vec<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            sort: None,
            filters: Vec::new(),
            with: Vec::new(),
        }
    }
}

impl ListQuery {
    /// Build from raw query pairs. Keys naming no allow-listed column are dropped.
    pub fn from_params(entity: &EntityMeta, params: &[(String, String)]) -> Self {
        let mut q = ListQuery::default();
        for (key, value) in params {
            match key.as_str() {
                "page" => q.page = parse_page(value),
                "per_page" => q.per_page = parse_per_page(value),
                "sort" => q.sort = parse_sort(entity, value),
                "with" => q.with = parse_with(Some(value)),
                _ => {
                    if let Some(f) = parse_filter(entity, key, value) {
                        q.filters.push(f);
                    }
                }
            }
        }
        q
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

fn parse_page(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, i64::from(u32::MAX)) as u32,
        Err(_) => DEFAULT_PAGE,
    }
}

fn parse_per_page(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, i64::from(MAX_PER_PAGE)) as u32,
        Err(_) => DEFAULT_PER_PAGE,
    }
}

/// `field` ascending or `-field` descending; unknown fields give `None` (id order).
fn parse_sort(entity: &EntityMeta, raw: &str) -> Option<Sort> {
    let (column, descending) = match raw.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    entity.is_column(column).then(|| Sort {
        column: column.to_string(),
        descending,
    })
}

/// Comma-separated relation short names, trimmed and deduplicated in order.
pub fn parse_with(raw: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn column_value(entity: &EntityMeta, column: &str, raw: &str) -> Value {
    match entity.property(column) {
        Some(p) => p.kind.filter_value(raw),
        // id is the only integer column without a property entry.
        None if column == crate::config::ID_COLUMN => PropertyKind::Integer.filter_value(raw),
        None => Value::String(raw.to_string()),
    }
}

fn parse_filter(entity: &EntityMeta, key: &str, raw: &str) -> Option<Filter> {
    if RESERVED.contains(&key) {
        return None;
    }
    for suffix in SUFFIXES {
        let Some(column) = key.strip_suffix(suffix) else {
            continue;
        };
        if !entity.is_column(column) {
            break;
        }
        let op = match suffix {
            "_like" => FilterOp::Like(Value::String(raw.to_string())),
            "_gte" => FilterOp::Gte(column_value(entity, column, raw)),
            "_lte" => FilterOp::Lte(column_value(entity, column, raw)),
            "_gt" => FilterOp::Gt(column_value(entity, column, raw)),
            "_lt" => FilterOp::Lt(column_value(entity, column, raw)),
            _ if raw == "true" => FilterOp::IsNull,
            _ => FilterOp::NotNull,
        };
        return Some(Filter {
            column: column.to_string(),
            op,
        });
    }
    entity.is_column(key).then(|| Filter {
        column: key.to_string(),
        op: FilterOp::Eq(column_value(entity, key, raw)),
    })
}
