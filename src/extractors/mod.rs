//! Request extractors.

mod tenant;

pub use tenant::{Tenant, TENANT_ID_HEADER};
