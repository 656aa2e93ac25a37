//! Services: casting, normalization and tenant-scoped execution.

pub mod cast;
mod crud;
mod normalize;
mod query;
mod table;

pub use crud::{cast_pk, split_page, CrudService, Page};
pub use normalize::{normalize_insert, normalize_update, NormalizedRecord};
pub use query::{cap_limit, QueryService};
pub use table::{admit, TableAccess};
