#![allow(dead_code)]

use scaffold_sdk::{open_in_memory, parse, resolve, AppState, CrudService};

pub const SCHEMA: &str = r#"
name: Test
entities:
  Category:
    properties:
      - name
      - { name: sort_order, type: integer, default: 0 }
    seed:
      - { name: "Alpha", sort_order: 0 }
      - { name: "Beta", sort_order: 1 }
      - { name: "Gamma", sort_order: 2 }

  Item:
    properties:
      - { name: category_id, type: relation, entity: Category }
      - name
      - { name: item_type, type: enum, values: [access, consumable, returnable] }
      - { name: quantity, type: integer, nullable: true }
      - { name: is_active, type: boolean, default: true }
      - { name: price, type: number, nullable: true }
      - { name: email, type: email, nullable: true }
      - { name: config, type: json, nullable: true }
      - { name: uuid, type: uuid }

  ItemTag:
    pivot: true
    properties:
      - { name: item_id, type: relation, entity: Item }
      - { name: tag_id, type: relation, entity: Tag }

  Tag:
    properties:
      - label
    seed:
      - { label: red }
      - { label: green }
      - { label: blue }
"#;

/// Fresh in-memory store, migrated and seeded with `SCHEMA`.
pub async fn state() -> AppState {
    state_for(SCHEMA).await
}

pub async fn state_for(schema: &str) -> AppState {
    let pool = open_in_memory().await.unwrap();
    let model = resolve(&parse(schema).unwrap()).unwrap();
    AppState::prepare(pool, model).await.unwrap()
}

pub fn service(state: &AppState, entity: &str) -> CrudService {
    state
        .crud_services()
        .into_iter()
        .find(|s| s.entity().entity_name == entity)
        .unwrap()
}

pub fn object(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match v {
        serde_json::Value::Object(m) => m,
        other => panic!("not an object: {other}"),
    }
}
