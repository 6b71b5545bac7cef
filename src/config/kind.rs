//! Property kinds and the per-kind storage rules shared by DDL, writes, and reads.
//! Validation is the fourth per-kind site (see `service::validation`).

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Text,
    Integer,
    Number,
    Boolean,
    Enum,
    Uuid,
    Json,
    Email,
    Relation,
}

impl PropertyKind {
    /// Parse a schema type name. Unknown names return `None`; callers fall back to `String`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => PropertyKind::String,
            "text" => PropertyKind::Text,
            "integer" => PropertyKind::Integer,
            "number" => PropertyKind::Number,
            "boolean" => PropertyKind::Boolean,
            "enum" => PropertyKind::Enum,
            "uuid" => PropertyKind::Uuid,
            "json" => PropertyKind::Json,
            "email" => PropertyKind::Email,
            "relation" => PropertyKind::Relation,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Text => "text",
            PropertyKind::Integer => "integer",
            PropertyKind::Number => "number",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Enum => "enum",
            PropertyKind::Uuid => "uuid",
            PropertyKind::Json => "json",
            PropertyKind::Email => "email",
            PropertyKind::Relation => "relation",
        }
    }

    /// SQLite column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            PropertyKind::Integer | PropertyKind::Relation | PropertyKind::Boolean => "INTEGER",
            PropertyKind::Number => "REAL",
            PropertyKind::String
            | PropertyKind::Text
            | PropertyKind::Enum
            | PropertyKind::Uuid
            | PropertyKind::Json
            | PropertyKind::Email => "TEXT",
        }
    }

    /// Request value -> storage value.
    pub fn coerce(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            PropertyKind::Boolean => Value::from(i64::from(is_truthy_flag(value))),
            PropertyKind::Json => match value {
                Value::String(_) => value.clone(),
                other => Value::String(other.to_string()),
            },
            PropertyKind::String
            | PropertyKind::Text
            | PropertyKind::Integer
            | PropertyKind::Number
            | PropertyKind::Enum
            | PropertyKind::Uuid
            | PropertyKind::Email
            | PropertyKind::Relation => value.clone(),
        }
    }

    /// Stored value -> response value.
    pub fn decode(&self, stored: Value) -> Value {
        match (self, stored) {
            (_, Value::Null) => Value::Null,
            (PropertyKind::Json, Value::String(s)) => {
                serde_json::from_str(&s).unwrap_or(Value::String(s))
            }
            (PropertyKind::Boolean, Value::Number(n)) => Value::Bool(n.as_i64() == Some(1)),
            (PropertyKind::Boolean, Value::Bool(b)) => Value::Bool(b),
            (
                PropertyKind::String
                | PropertyKind::Text
                | PropertyKind::Integer
                | PropertyKind::Number
                | PropertyKind::Boolean
                | PropertyKind::Enum
                | PropertyKind::Uuid
                | PropertyKind::Json
                | PropertyKind::Email
                | PropertyKind::Relation,
                other,
            ) => other,
        }
    }

    /// Query-string value -> bind value for equality/comparison filters.
    /// Falls back to the raw text when the value does not parse for this kind.
    pub fn filter_value(&self, raw: &str) -> Value {
        match self {
            PropertyKind::Integer | PropertyKind::Relation => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            PropertyKind::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            PropertyKind::Boolean => match raw {
                "true" | "1" => Value::from(1),
                "false" | "0" => Value::from(0),
                _ => Value::String(raw.to_string()),
            },
            PropertyKind::String
            | PropertyKind::Text
            | PropertyKind::Enum
            | PropertyKind::Uuid
            | PropertyKind::Json
            | PropertyKind::Email => Value::String(raw.to_string()),
        }
    }
}

/// `true`, `"true"` and `1` are truthy; everything else stores as 0.
fn is_truthy_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_names_do_not_parse() {
        assert_eq!(PropertyKind::parse("relation"), Some(PropertyKind::Relation));
        assert_eq!(PropertyKind::parse("datetime"), None);
        assert_eq!(PropertyKind::parse("String"), None);
    }

    #[test]
    fn sql_type_mapping() {
        assert_eq!(PropertyKind::Boolean.sql_type(), "INTEGER");
        assert_eq!(PropertyKind::Relation.sql_type(), "INTEGER");
        assert_eq!(PropertyKind::Number.sql_type(), "REAL");
        assert_eq!(PropertyKind::Json.sql_type(), "TEXT");
        assert_eq!(PropertyKind::Email.sql_type(), "TEXT");
    }

    #[test]
    fn boolean_coercion_accepts_only_true_forms() {
        let b = PropertyKind::Boolean;
        assert_eq!(b.coerce(&json!(true)), json!(1));
        assert_eq!(b.coerce(&json!("true")), json!(1));
        assert_eq!(b.coerce(&json!(1)), json!(1));
        assert_eq!(b.coerce(&json!(false)), json!(0));
        assert_eq!(b.coerce(&json!("yes")), json!(0));
        assert_eq!(b.coerce(&json!(2)), json!(0));
        assert_eq!(b.coerce(&Value::Null), Value::Null);
    }

    #[test]
    fn json_coercion_serializes_non_strings() {
        let j = PropertyKind::Json;
        assert_eq!(j.coerce(&json!({"foo": "bar"})), json!(r#"{"foo":"bar"}"#));
        assert_eq!(j.coerce(&json!("[1,2]")), json!("[1,2]"));
    }

    #[test]
    fn decode_reverses_coercion() {
        assert_eq!(PropertyKind::Json.decode(json!(r#"{"foo":"bar"}"#)), json!({"foo": "bar"}));
        assert_eq!(PropertyKind::Json.decode(json!("not json")), json!("not json"));
        assert_eq!(PropertyKind::Boolean.decode(json!(1)), json!(true));
        assert_eq!(PropertyKind::Boolean.decode(json!(0)), json!(false));
        assert_eq!(PropertyKind::Integer.decode(json!(7)), json!(7));
        assert_eq!(PropertyKind::Boolean.decode(Value::Null), Value::Null);
    }

    #[test]
    fn filter_values_follow_column_kind() {
        assert_eq!(PropertyKind::Integer.filter_value("3"), json!(3));
        assert_eq!(PropertyKind::Integer.filter_value("x"), json!("x"));
        assert_eq!(PropertyKind::Number.filter_value("2.5"), json!(2.5));
        assert_eq!(PropertyKind::Boolean.filter_value("true"), json!(1));
        assert_eq!(PropertyKind::String.filter_value("42"), json!("42"));
    }
}
