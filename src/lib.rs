//! Tenant-isolated, schema-validated CRUD and restricted querying over PostgreSQL.

pub mod config;
pub mod dsl;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod tenant;

pub use config::{Settings, TablePolicy};
pub use error::{AppError, ConfigError};
pub use routes::{app, common_routes, common_routes_with_ready, crud_routes, query_routes};
pub use schema::{SchemaResolver, TableSchema};
pub use service::{CrudService, QueryService, TableAccess};
pub use state::AppState;
pub use tenant::{TenantColumns, TenantId, TenantScope};
