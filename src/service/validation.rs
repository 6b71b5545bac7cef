//! Request validation from property declarations.

use crate::config::{EntityMeta, PropertyDef, PropertyKind, SchemaModel};
use crate::error::AppError;
use crate::sql::{bind_params, exists_by_id};
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::sync::OnceLock;

fn is_email(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

pub struct RequestValidator;

impl RequestValidator {
    /// Check `body` property by property in declaration order; the first failure is returned.
    /// In partial mode absent fields are never required.
    pub async fn validate(
        pool: &SqlitePool,
        model: &SchemaModel,
        entity: &EntityMeta,
        body: &Map<String, Value>,
        partial: bool,
    ) -> Result<(), AppError> {
        for prop in &entity.properties {
            let Some(v) = body.get(&prop.name) else {
                if !partial && prop.is_required() {
                    return Err(AppError::Validation(format!("{} is required", prop.name)));
                }
                continue;
            };
            if v.is_null() {
                continue;
            }
            validate_field(prop, v)?;
            if prop.kind == PropertyKind::Relation {
                check_reference(pool, model, entity, prop, v).await?;
            }
        }
        Ok(())
    }
}

/// Shape checks that need no datastore access.
pub fn validate_field(prop: &PropertyDef, v: &Value) -> Result<(), AppError> {
    let col = &prop.name;
    match prop.kind {
        PropertyKind::Enum => {
            if prop.values.is_empty() {
                return Ok(());
            }
            let ok = v.as_str().is_some_and(|s| prop.values.iter().any(|a| a == s));
            if !ok {
                return Err(AppError::Validation(format!(
                    "{} must be one of: {}",
                    col,
                    prop.values.join(", ")
                )));
            }
        }
        PropertyKind::Email => {
            if !v.as_str().is_some_and(is_email) {
                return Err(AppError::Validation(format!(
                    "{} must be a valid email address",
                    col
                )));
            }
        }
        PropertyKind::Json => {
            if let Some(s) = v.as_str() {
                if serde_json::from_str::<Value>(s).is_err() {
                    return Err(AppError::Validation(format!("{} must be valid JSON", col)));
                }
            }
        }
        PropertyKind::String
        | PropertyKind::Text
        | PropertyKind::Integer
        | PropertyKind::Number
        | PropertyKind::Boolean
        | PropertyKind::Uuid
        | PropertyKind::Relation => {}
    }
    Ok(())
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Point lookup of the referenced row. Skipped when the target entity is not in the schema.
/// Non-integer values are bound as given and simply never match.
async fn check_reference(
    pool: &SqlitePool,
    model: &SchemaModel,
    entity: &EntityMeta,
    prop: &PropertyDef,
    v: &Value,
) -> Result<(), AppError> {
    let Some(rel) = entity.relation_for_property(&prop.name) else {
        return Ok(());
    };
    let Some(target) = model.entity_by_name(&rel.target_entity) else {
        return Ok(());
    };
    let shown = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let id = as_integer(v)
        .map(Value::from)
        .unwrap_or_else(|| Value::String(shown.clone()));
    let q = exists_by_id(target, &id);
    let found = bind_params(&q.sql, &q.params).fetch_optional(pool).await?;
    if found.is_none() {
        return Err(AppError::Validation(format!(
            "{} references a non-existent {} (id: {})",
            prop.name, rel.target_entity, shown
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(name: &str, kind: PropertyKind) -> PropertyDef {
        PropertyDef::new(name, kind)
    }

    fn message(r: Result<(), AppError>) -> String {
        r.unwrap_err().to_string()
    }

    #[test]
    fn enum_membership() {
        let mut p = prop("item_type", PropertyKind::Enum);
        p.values = vec!["access".into(), "consumable".into(), "returnable".into()];
        assert!(validate_field(&p, &json!("consumable")).is_ok());
        assert_eq!(
            message(validate_field(&p, &json!("gadget"))),
            "item_type must be one of: access, consumable, returnable"
        );
        assert!(validate_field(&p, &json!(1)).is_err());
    }

    #[test]
    fn empty_enum_accepts_anything() {
        let p = prop("kind", PropertyKind::Enum);
        assert!(validate_field(&p, &json!("whatever")).is_ok());
    }

    #[test]
    fn email_shape() {
        let p = prop("email", PropertyKind::Email);
        assert!(validate_field(&p, &json!("a@b.co")).is_ok());
        for bad in [json!("a@b"), json!("a b@c.d"), json!("@b.c"), json!(5)] {
            assert_eq!(
                message(validate_field(&p, &bad)),
                "email must be a valid email address"
            );
        }
    }

    #[test]
    fn json_strings_must_parse() {
        let p = prop("config", PropertyKind::Json);
        assert!(validate_field(&p, &json!(r#"{"a":1}"#)).is_ok());
        assert!(validate_field(&p, &json!({"a": 1})).is_ok());
        assert_eq!(message(validate_field(&p, &json!("{oops"))), "config must be valid JSON");
    }

    #[test]
    fn unconstrained_kinds_accept_any_shape() {
        for kind in [
            PropertyKind::Integer,
            PropertyKind::Number,
            PropertyKind::Uuid,
            PropertyKind::Relation,
            PropertyKind::Boolean,
        ] {
            let p = prop("field", kind);
            for v in [json!("lots"), json!("legacy-1"), json!(1.5), json!(true)] {
                assert!(validate_field(&p, &v).is_ok(), "{kind:?} rejected {v}");
            }
        }
    }
}
