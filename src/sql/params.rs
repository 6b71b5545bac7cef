//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteTypeInfo};
use sqlx::{Database, Type};

/// A value that can be bound to a SQLite query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl BindValue {
    /// Booleans bind as 0/1; arrays and objects bind as their JSON text.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Integer(i64::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Integer(i)
                } else {
                    BindValue::Real(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Text(v.to_string()),
        }
    }
}

/// Prepare `sql` with every param bound in order.
pub fn bind_params<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(BindValue::from_json(p));
    }
    query
}

impl<'q> Encode<'q, Sqlite> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            BindValue::Null => Ok(IsNull::Yes),
            BindValue::Integer(n) => <i64 as Encode<Sqlite>>::encode_by_ref(n, buf),
            BindValue::Real(n) => <f64 as Encode<Sqlite>>::encode_by_ref(n, buf),
            BindValue::Text(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf),
        }
    }
}

impl Type<Sqlite> for BindValue {
    fn type_info() -> SqliteTypeInfo {
        <str as Type<Sqlite>>::type_info()
    }

    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_json_scalars() {
        assert_eq!(BindValue::from_json(&json!(null)), BindValue::Null);
        assert_eq!(BindValue::from_json(&json!(true)), BindValue::Integer(1));
        assert_eq!(BindValue::from_json(&json!(42)), BindValue::Integer(42));
        assert_eq!(BindValue::from_json(&json!(1.5)), BindValue::Real(1.5));
        assert_eq!(BindValue::from_json(&json!("a%")), BindValue::Text("a%".into()));
        assert_eq!(
            BindValue::from_json(&json!({"k": [1]})),
            BindValue::Text(r#"{"k":[1]}"#.into())
        );
    }
}
