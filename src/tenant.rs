//! Tenant identity and the per-table tenant predicate.

use crate::error::AppError;
use crate::schema::TableSchema;
use crate::service::cast::cast_optional;
use crate::sql::SqlValue;
use serde_json::Value;

pub const DEFAULT_TENANT_COLUMN: &str = "company_id";
pub const DEFAULT_LEGACY_TENANT_COLUMN: &str = "com_id";

/// Authenticated tenant identifier. Opaque: only trimmed and checked for emptiness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(raw: &str) -> Result<Self, AppError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(AppError::BadRequest("tenant id is required".into()));
        }
        Ok(TenantId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column names that carry the tenant. The preferred name wins over the legacy one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantColumns {
    pub preferred: String,
    pub legacy: Option<String>,
}

impl TenantColumns {
    pub fn new(preferred: impl Into<String>, legacy: Option<String>) -> Self {
        TenantColumns {
            preferred: preferred.into(),
            legacy: legacy.filter(|l| !l.trim().is_empty()),
        }
    }

    /// Tenant column present on `schema`, if any.
    pub fn column_for<'a>(&'a self, schema: &TableSchema) -> Option<&'a str> {
        if schema.has_column(&self.preferred) {
            return Some(&self.preferred);
        }
        self.legacy.as_deref().filter(|l| schema.has_column(l))
    }

    pub fn require<'a>(&'a self, schema: &TableSchema) -> Result<&'a str, AppError> {
        self.column_for(schema).ok_or_else(|| {
            AppError::validation(
                self.preferred.clone(),
                format!("table does not support tenant filter ({} missing)", self.preferred),
            )
        })
    }

    /// True for either configured name; such columns are never writable from caller input.
    pub fn is_tenant_column(&self, column: &str) -> bool {
        column == self.preferred || self.legacy.as_deref() == Some(column)
    }
}

impl Default for TenantColumns {
    fn default() -> Self {
        TenantColumns::new(DEFAULT_TENANT_COLUMN, Some(DEFAULT_LEGACY_TENANT_COLUMN.to_string()))
    }
}

/// Tenant predicate for one table: column plus the id cast to that column's kind.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantScope {
    pub column: String,
    pub value: SqlValue,
}

impl TenantScope {
    pub fn for_schema(schema: &TableSchema, columns: &TenantColumns, tenant: &TenantId) -> Result<Self, AppError> {
        let column = columns.require(schema)?;
        let value = cast_optional(schema.cast_of(column), &Value::String(tenant.as_str().to_string()))
            .map_err(|reason| AppError::validation(column, reason))?;
        Ok(TenantScope {
            column: column.to_string(),
            value,
        })
    }
}
