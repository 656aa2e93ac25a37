//! Safe SQL builders: identifiers from resolved schemas only, values as parameters.

mod builder;
mod ident;
pub mod page;
pub mod params;
mod query;

pub use builder::*;
pub use ident::{is_safe_ident, qualified_table, quoted};
pub use page::{OrderBy, PageParams, PageRequest, Paging};
pub use params::*;
pub use query::{build_query, SchemaSet};
