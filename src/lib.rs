//! Scaffold SDK: schema-driven SQLite data layer with a uniform CRUD API.

pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod naming;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_from_path, parse, resolve, EntityMeta, PropertyDef, PropertyKind, SchemaConfig, SchemaModel};
pub use error::{AppError, ConfigError};
pub use migration::{migrate, MigrationReport};
pub use response::{success_one, success_one_ok, success_page};
pub use routes::{common_routes_with_ready, entity_routes};
pub use seed::{seed, SeedReport};
pub use service::{CrudService, ListQuery};
pub use state::AppState;
pub use store::{open_datastore, open_in_memory, Settings};
