//! Schema document types: the raw YAML shape and its normalized form.

use crate::config::PropertyKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top level of `scaffold.yml`. Unknown keys (e.g. `ai`) are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entities: Option<serde_yaml::Mapping>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEntity {
    #[serde(default)]
    /// Kept as raw YAML so one unusable entry only drops that entry.
    pub properties: Option<serde_yaml::Value>,
    #[serde(default)]
    pub pivot: Option<bool>,
    #[serde(default)]
    pub seed: Option<Vec<Map<String, Value>>>,
}

/// A property is either a bare name (`- title`) or a full object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawProperty {
    Bare(String),
    Full(RawPropertyObject),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPropertyObject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub entity: Option<String>,
}

/// One normalized entity attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    pub nullable: bool,
    pub default: Option<Value>,
    /// Allowed values; only meaningful for `PropertyKind::Enum`.
    pub values: Vec<String>,
    /// Target entity name; only meaningful for `PropertyKind::Relation`.
    pub entity: Option<String>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        PropertyDef {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
            values: Vec::new(),
            entity: None,
        }
    }

    /// Must be present on full writes: not nullable, no default, not auto-generated.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none() && self.kind != PropertyKind::Uuid
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityDef {
    pub properties: Vec<PropertyDef>,
    pub pivot: bool,
    pub seed: Vec<Map<String, Value>>,
}

/// Parsed schema document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaConfig {
    pub name: Option<String>,
    pub entities: BTreeMap<String, EntityDef>,
}
