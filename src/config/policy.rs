//! Deny-list table policy.

use std::collections::HashSet;

/// Tables an entry point refuses to touch. `*` denies everything; an empty list allows everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TablePolicy {
    deny_all: bool,
    denied: HashSet<String>,
}

impl TablePolicy {
    /// Parse a comma-separated deny list. Names are case-insensitive.
    pub fn parse(denied_raw: &str) -> Self {
        let mut policy = TablePolicy::default();
        for name in denied_raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if name == "*" {
                policy.deny_all = true;
            } else {
                policy.denied.insert(name.to_lowercase());
            }
        }
        policy
    }

    pub fn allows(&self, table: &str) -> bool {
        let name = table.trim().to_lowercase();
        !name.is_empty() && !self.deny_all && !self.denied.contains(&name)
    }
}
