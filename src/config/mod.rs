pub mod kind;
pub mod types;
pub mod loader;
pub mod validator;
pub mod resolved;

pub use kind::*;
pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
