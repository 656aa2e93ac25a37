//! Runtime settings and table access policy.

mod policy;
mod settings;

pub use policy::TablePolicy;
pub use settings::Settings;
