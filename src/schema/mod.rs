//! Table schema model, declarative definitions, catalog introspection and the resolver cache.

mod cache;
pub mod definition;
pub mod introspect;
mod resolver;
mod table;

pub use cache::SchemaCache;
pub use definition::SchemaDefinition;
pub use resolver::{normalize_table_name, SchemaResolver};
pub use table::{CastKind, Clock, TableSchema};
