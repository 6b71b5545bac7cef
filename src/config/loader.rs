//! Load the schema document and compile it into the runtime model.

use crate::config::resolved::{EntityMeta, RelationMeta, SchemaModel, CREATED_AT, ID_COLUMN, UPDATED_AT};
use crate::config::types::*;
use crate::config::{validate, PropertyKind};
use crate::error::ConfigError;
use crate::naming;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Parse schema text (YAML; JSON also parses). A document without `entities` yields an empty map.
pub fn parse(text: &str) -> Result<SchemaConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(SchemaConfig::default());
    }
    let raw: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
    if !raw.is_mapping() {
        return Ok(SchemaConfig::default());
    }
    let doc: RawDocument =
        serde_yaml::from_value(raw).map_err(|e| ConfigError::Load(e.to_string()))?;

    let mut entities = BTreeMap::new();
    for (key, value) in doc.entities.unwrap_or_default() {
        let Some(entity_name) = key.as_str().map(str::to_string) else {
            tracing::warn!(key = ?key, "skipping entity with non-string name");
            continue;
        };
        let raw_entity: RawEntity = if value.is_null() {
            RawEntity::default()
        } else {
            serde_yaml::from_value(value)
                .map_err(|e| ConfigError::Load(format!("entity {}: {}", entity_name, e)))?
        };
        let entity = normalize_entity(&entity_name, raw_entity);
        entities.insert(entity_name, entity);
    }

    Ok(SchemaConfig {
        name: doc.name,
        entities,
    })
}

fn normalize_entity(entity_name: &str, raw: RawEntity) -> EntityDef {
    let pivot = raw.pivot.unwrap_or(false);
    let mut seen = HashSet::new();
    let mut properties = Vec::new();
    let entries = match raw.properties {
        None | Some(serde_yaml::Value::Null) => Vec::new(),
        Some(serde_yaml::Value::Sequence(entries)) => entries,
        Some(_) => {
            tracing::warn!(entity = %entity_name, "properties is not a list; ignoring it");
            Vec::new()
        }
    };
    for entry in entries {
        let raw_prop = match serde_yaml::from_value::<RawProperty>(entry) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(entity = %entity_name, error = %e, "skipping unusable property entry");
                continue;
            }
        };
        let Some(prop) = normalize_property(entity_name, raw_prop) else {
            continue;
        };
        let reserved = prop.name == ID_COLUMN
            || (!pivot && (prop.name == CREATED_AT || prop.name == UPDATED_AT));
        if reserved {
            tracing::warn!(entity = %entity_name, property = %prop.name, "skipping property that shadows a system column");
            continue;
        }
        if !seen.insert(prop.name.clone()) {
            tracing::warn!(entity = %entity_name, property = %prop.name, "duplicate property; keeping the first declaration");
            continue;
        }
        properties.push(prop);
    }
    EntityDef {
        properties,
        pivot,
        seed: raw.seed.unwrap_or_default(),
    }
}

/// Bare names become string properties; unknown or missing types fall back to string.
/// Returns `None` for an object without a name.
pub fn normalize_property(entity_name: &str, raw: RawProperty) -> Option<PropertyDef> {
    let obj = match raw {
        RawProperty::Bare(name) => return Some(PropertyDef::new(name, PropertyKind::String)),
        RawProperty::Full(obj) => obj,
    };
    let Some(name) = obj.name.filter(|n| !n.is_empty()) else {
        tracing::warn!(entity = %entity_name, "skipping property without a name");
        return None;
    };
    let kind = match obj.type_.as_deref() {
        None => PropertyKind::String,
        Some(t) => PropertyKind::parse(t).unwrap_or_else(|| {
            tracing::warn!(entity = %entity_name, property = %name, type_name = %t, "unknown property type; using string");
            PropertyKind::String
        }),
    };
    let values = obj
        .values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
            other => Some(other.to_string()),
        })
        .collect();
    Some(PropertyDef {
        name,
        kind,
        nullable: obj.nullable.unwrap_or(false),
        default: obj.default,
        values,
        entity: obj.entity,
    })
}

/// Compile entity definitions into storage-ready metadata. Relations whose target entity is
/// not declared are left out.
pub fn derive(config: &SchemaConfig) -> Vec<EntityMeta> {
    config
        .entities
        .iter()
        .map(|(entity_name, def)| {
            let relations = def
                .properties
                .iter()
                .filter(|p| p.kind == PropertyKind::Relation)
                .filter_map(|p| {
                    let target = p.entity.as_ref()?;
                    if !config.entities.contains_key(target) {
                        return None;
                    }
                    Some(RelationMeta {
                        property: p.name.clone(),
                        target_entity: target.clone(),
                        target_table: naming::table_name(target),
                    })
                })
                .collect();
            EntityMeta::new(
                entity_name.clone(),
                naming::table_name(entity_name),
                naming::route_path(entity_name),
                def.properties.clone(),
                def.pivot,
                def.seed.clone(),
                relations,
            )
        })
        .collect()
}

/// Build the runtime model: validate (logging non-fatal issues), then derive.
pub fn resolve(config: &SchemaConfig) -> Result<SchemaModel, ConfigError> {
    for issue in validate(config)? {
        tracing::warn!(%issue, "schema issue");
    }
    let entities = derive(config);
    tracing::debug!(count = entities.len(), "resolved entities");
    Ok(SchemaModel::new(config.name.clone(), entities))
}

/// Read and parse a schema file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<SchemaConfig, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: Blog
entities:
  User:
    properties:
      - name
      - { name: email, type: email }
      - { name: role, type: enum, values: [admin, editor] }
  Post:
    properties:
      - title
      - { name: body, type: text, nullable: true }
      - { name: user_id, type: relation, entity: User }
      - { name: published, type: boolean, default: false }
      - { name: rating, type: stars }
    seed:
      - { title: "Hello World", user_id: 1 }
  PostTag:
    pivot: true
    properties:
      - { name: post_id, type: relation, entity: Post }
      - { name: tag_id, type: relation, entity: Tag }
"#;

    #[test]
    fn parses_bare_and_full_properties() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.name.as_deref(), Some("Blog"));
        let user = &config.entities["User"];
        assert_eq!(user.properties[0], PropertyDef::new("name", PropertyKind::String));
        assert_eq!(user.properties[1].kind, PropertyKind::Email);
        assert_eq!(user.properties[2].values, vec!["admin", "editor"]);
        assert!(!user.pivot);
    }

    #[test]
    fn unknown_type_falls_back_to_string() {
        let config = parse(SAMPLE).unwrap();
        let rating = config.entities["Post"]
            .properties
            .iter()
            .find(|p| p.name == "rating")
            .unwrap();
        assert_eq!(rating.kind, PropertyKind::String);
    }

    #[test]
    fn parses_seed_rows_and_defaults() {
        let config = parse(SAMPLE).unwrap();
        let post = &config.entities["Post"];
        assert_eq!(post.seed.len(), 1);
        assert_eq!(post.seed[0]["title"], "Hello World");
        let published = post.properties.iter().find(|p| p.name == "published").unwrap();
        assert_eq!(published.default, Some(Value::Bool(false)));
        assert!(!published.is_required());
    }

    #[test]
    fn document_without_entities_is_empty() {
        assert!(parse("name: Empty\n").unwrap().entities.is_empty());
        assert!(parse("").unwrap().entities.is_empty());
        assert!(parse("entities:\n").unwrap().entities.is_empty());
    }

    #[test]
    fn broken_yaml_is_a_load_error() {
        let err = parse("entities: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn unusable_property_entries_are_skipped() {
        let config = parse(
            "entities:\n  Box:\n    properties:\n      - 5\n      - [a, b]\n      - { name: 7 }\n      - label\n  Crate:\n    properties: nope\n",
        )
        .unwrap();
        let names: Vec<&str> = config.entities["Box"]
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["label"]);
        assert!(config.entities["Crate"].properties.is_empty());
    }

    #[test]
    fn drops_system_columns_and_duplicates() {
        let config = parse(
            r#"
entities:
  Note:
    properties:
      - id
      - title
      - { name: title, type: integer }
      - created_at
  Link:
    pivot: true
    properties:
      - created_at
"#,
        )
        .unwrap();
        let note = &config.entities["Note"];
        assert_eq!(note.properties.len(), 1);
        assert_eq!(note.properties[0].kind, PropertyKind::String);
        assert_eq!(config.entities["Link"].properties[0].name, "created_at");
    }

    #[test]
    fn derives_names_and_resolvable_relations() {
        let metas = derive(&parse(SAMPLE).unwrap());
        let tag = metas.iter().find(|m| m.entity_name == "PostTag").unwrap();
        assert_eq!(tag.table_name, "post_tags");
        assert_eq!(tag.route_path, "posttags");
        assert!(tag.pivot);
        // Tag is not declared, so only the Post relation survives.
        assert_eq!(
            tag.relations,
            vec![RelationMeta {
                property: "post_id".into(),
                target_entity: "Post".into(),
                target_table: "posts".into(),
            }]
        );

        let post = metas.iter().find(|m| m.entity_name == "Post").unwrap();
        assert_eq!(post.relations[0].short_name(), "user");
    }

    #[test]
    fn allow_list_includes_system_columns() {
        let metas = derive(&parse(SAMPLE).unwrap());
        let post = metas.iter().find(|m| m.entity_name == "Post").unwrap();
        for col in ["id", "title", "user_id", "created_at", "updated_at"] {
            assert!(post.is_column(col), "{col}");
        }
        assert!(!post.is_column("password"));

        let tag = metas.iter().find(|m| m.entity_name == "PostTag").unwrap();
        assert!(!tag.is_column("created_at"));
        assert_eq!(tag.column_names(), vec!["id", "post_id", "tag_id"]);
    }

    #[test]
    fn resolve_indexes_by_route_path() {
        let model = resolve(&parse(SAMPLE).unwrap()).unwrap();
        assert_eq!(model.entity_by_path("posts").unwrap().entity_name, "Post");
        assert!(model.entity_by_path("post_tags").is_none());
        assert_eq!(model.entity_by_name("PostTag").unwrap().route_path, "posttags");
    }
}
