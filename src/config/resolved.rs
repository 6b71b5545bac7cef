//! Resolved entity model: schema normalized and flattened for runtime use.

use crate::config::PropertyDef;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// A relation property whose target entity exists in the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMeta {
    pub property: String,
    pub target_entity: String,
    pub target_table: String,
}

impl RelationMeta {
    /// Key used by `with=` and for the attached record, e.g. "category" for "category_id".
    pub fn short_name(&self) -> &str {
        crate::naming::relation_short_name(&self.property)
    }
}

#[derive(Clone, Debug)]
pub struct EntityMeta {
    pub entity_name: String,
    pub table_name: String,
    pub route_path: String,
    pub properties: Vec<PropertyDef>,
    pub pivot: bool,
    pub seed: Vec<Map<String, Value>>,
    pub relations: Vec<RelationMeta>,
    /// Every column name that may appear in generated SQL.
    pub(crate) columns: BTreeSet<String>,
}

impl EntityMeta {
    pub fn new(
        entity_name: String,
        table_name: String,
        route_path: String,
        properties: Vec<PropertyDef>,
        pivot: bool,
        seed: Vec<Map<String, Value>>,
        relations: Vec<RelationMeta>,
    ) -> Self {
        let mut columns: BTreeSet<String> = properties.iter().map(|p| p.name.clone()).collect();
        columns.insert(ID_COLUMN.to_string());
        if !pivot {
            columns.insert(CREATED_AT.to_string());
            columns.insert(UPDATED_AT.to_string());
        }
        EntityMeta {
            entity_name,
            table_name,
            route_path,
            properties,
            pivot,
            seed,
            relations,
            columns,
        }
    }

    /// Allow-list check for any identifier that will be written into SQL.
    pub fn is_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Columns in physical order: id, properties, then timestamps.
    pub fn column_names(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.properties.len() + 3);
        out.push(ID_COLUMN);
        out.extend(self.properties.iter().map(|p| p.name.as_str()));
        if !self.pivot {
            out.push(CREATED_AT);
            out.push(UPDATED_AT);
        }
        out
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn relation_by_short_name(&self, short: &str) -> Option<&RelationMeta> {
        self.relations.iter().find(|r| r.short_name() == short)
    }

    pub fn relation_for_property(&self, property: &str) -> Option<&RelationMeta> {
        self.relations.iter().find(|r| r.property == property)
    }
}

/// All entities of one schema, indexed for lookup. Immutable after startup.
#[derive(Clone, Debug, Default)]
pub struct SchemaModel {
    pub name: Option<String>,
    pub entities: Vec<Arc<EntityMeta>>,
    by_name: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl SchemaModel {
    pub fn new(name: Option<String>, entities: Vec<EntityMeta>) -> Self {
        let entities: Vec<Arc<EntityMeta>> = entities.into_iter().map(Arc::new).collect();
        let by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.entity_name.clone(), i))
            .collect();
        let by_path = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.route_path.clone(), i))
            .collect();
        SchemaModel {
            name,
            entities,
            by_name,
            by_path,
        }
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Arc<EntityMeta>> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&Arc<EntityMeta>> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn metas(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.iter().map(|e| e.as_ref())
    }
}
