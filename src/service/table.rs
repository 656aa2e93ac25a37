//! Table access gate shared by the CRUD endpoints.

use crate::config::TablePolicy;
use crate::error::AppError;
use crate::schema::{normalize_table_name, SchemaResolver, TableSchema};
use crate::tenant::{TenantColumns, TenantId, TenantScope};
use sqlx::PgConnection;
use std::sync::Arc;

pub struct TableAccess<'a> {
    pub resolver: &'a SchemaResolver,
    pub policy: &'a TablePolicy,
    pub tenant_columns: &'a TenantColumns,
}

impl TableAccess<'_> {
    /// Normalize and policy-check `raw`, resolve its schema and bind the tenant scope.
    /// Tables without a tenant column are refused here, before any row is touched.
    pub async fn open(
        &self,
        conn: &mut PgConnection,
        raw: &str,
        tenant: &TenantId,
    ) -> Result<(Arc<TableSchema>, TenantScope), AppError> {
        let table = admit(self.policy, raw)?;
        let schema = self.resolver.resolve(conn, &table).await?;
        let scope = TenantScope::for_schema(&schema, self.tenant_columns, tenant)?;
        Ok((schema, scope))
    }
}

/// Normalized table name, or a validation error when the policy denies it.
pub fn admit(policy: &TablePolicy, raw: &str) -> Result<String, AppError> {
    let table = normalize_table_name(raw)?;
    if !policy.allows(&table) {
        tracing::warn!(table = %table, "table denied by policy");
        return Err(AppError::validation("table", "not allowed"));
    }
    Ok(table)
}
