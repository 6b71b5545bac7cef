//! Schema checks. Most problems degrade to a best-effort model and are only reported;
//! name collisions that make routing or storage ambiguous are fatal.

use crate::config::{PropertyKind, SchemaConfig};
use crate::error::ConfigError;
use crate::naming;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    #[error("{entity}.{property}: relation has no target entity")]
    MissingRelationTarget { entity: String, property: String },
    #[error("{entity}.{property}: relation target '{target}' is not declared")]
    UnresolvedRelation {
        entity: String,
        property: String,
        target: String,
    },
    #[error("{entity}.{property}: enum has no values; membership is not checked")]
    EmptyEnum { entity: String, property: String },
    #[error("'{0}' is not a plain identifier")]
    UnusualIdentifier(String),
}

pub fn validate(config: &SchemaConfig) -> Result<Vec<SchemaIssue>, ConfigError> {
    let mut issues = Vec::new();
    let mut paths: HashMap<String, &str> = HashMap::new();
    let mut tables: HashMap<String, &str> = HashMap::new();

    for (entity_name, entity) in &config.entities {
        if let Some(other) = paths.insert(naming::route_path(entity_name), entity_name) {
            return Err(ConfigError::DuplicatePathSegment(format!(
                "{} ({} and {})",
                naming::route_path(entity_name),
                other,
                entity_name
            )));
        }
        if let Some(other) = tables.insert(naming::table_name(entity_name), entity_name) {
            return Err(ConfigError::DuplicateTable(format!(
                "{} ({} and {})",
                naming::table_name(entity_name),
                other,
                entity_name
            )));
        }
        if !naming::is_plain_identifier(entity_name) {
            issues.push(SchemaIssue::UnusualIdentifier(entity_name.clone()));
        }

        for prop in &entity.properties {
            if !naming::is_plain_identifier(&prop.name) {
                issues.push(SchemaIssue::UnusualIdentifier(format!("{}.{}", entity_name, prop.name)));
            }
            match prop.kind {
                PropertyKind::Relation => match &prop.entity {
                    None => issues.push(SchemaIssue::MissingRelationTarget {
                        entity: entity_name.clone(),
                        property: prop.name.clone(),
                    }),
                    Some(target) if !config.entities.contains_key(target) => {
                        issues.push(SchemaIssue::UnresolvedRelation {
                            entity: entity_name.clone(),
                            property: prop.name.clone(),
                            target: target.clone(),
                        })
                    }
                    Some(_) => {}
                },
                PropertyKind::Enum if prop.values.is_empty() => issues.push(SchemaIssue::EmptyEnum {
                    entity: entity_name.clone(),
                    property: prop.name.clone(),
                }),
                _ => {}
            }
        }
    }

    Ok(issues)
}
