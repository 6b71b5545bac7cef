//! CrudService: per-entity CRUD over the safe SQL builder.

mod crud;
pub mod query;
mod validation;
pub use crud::{insert_values, now_timestamp, row_to_json, CrudService, Page};
pub use query::ListQuery;
pub use validation::{validate_field, RequestValidator};
