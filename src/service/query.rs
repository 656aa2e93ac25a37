//! Query expression endpoint service: parse, gate, resolve, build, run.

use crate::config::TablePolicy;
use crate::dsl::parse_query;
use crate::error::AppError;
use crate::schema::SchemaResolver;
use crate::service::CrudService;
use crate::sql::{build_query, is_safe_ident, SchemaSet};
use crate::tenant::{TenantColumns, TenantId};
use serde_json::Value;
use sqlx::PgConnection;

pub struct QueryService<'a> {
    pub resolver: &'a SchemaResolver,
    pub policy: &'a TablePolicy,
    pub tenant_columns: &'a TenantColumns,
    pub max_limit: i64,
}

impl QueryService<'_> {
    pub async fn run(&self, conn: &mut PgConnection, tenant: &TenantId, raw: &str) -> Result<Vec<Value>, AppError> {
        let mut spec = parse_query(raw)?;
        spec.limit = Some(cap_limit(spec.limit, self.max_limit));

        for table in spec.tables() {
            if !self.policy.allows(table) {
                tracing::warn!(table = %table, "query table denied by policy");
                return Err(AppError::validation("table", "not allowed"));
            }
        }

        let mut schemas = SchemaSet::new();
        for table in spec.tables() {
            // Unsafe and unknown names are left out; the builder reports them against the right key.
            if !is_safe_ident(table) || schemas.contains_key(table) {
                continue;
            }
            match self.resolver.resolve_columns(conn, table).await {
                Ok(schema) => {
                    schemas.insert(table.to_string(), schema);
                }
                Err(AppError::Validation(errors)) if errors.get("table").map(String::as_str) == Some("not found") => {}
                Err(e) => return Err(e),
            }
        }

        let q = build_query(&spec, tenant, &schemas, self.tenant_columns)?;
        CrudService::fetch_all(conn, &q).await
    }
}

/// Missing, non-positive and oversized limits all become `max`.
pub fn cap_limit(limit: Option<i64>, max: i64) -> i64 {
    match limit {
        Some(n) if n > 0 && n <= max => n,
        _ => max,
    }
}
