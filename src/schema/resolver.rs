//! Table schema resolution: declarative file first, catalog introspection for everything it omits.

use crate::error::AppError;
use crate::schema::definition::load_definition;
use crate::schema::introspect::{columns_from_catalog, introspect_columns, introspect_primary_key, introspect_table};
use crate::schema::{SchemaCache, TableSchema};
use crate::sql::is_safe_ident;
use sqlx::PgConnection;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct SchemaResolver {
    /// Database namespace introspected and used to qualify tables.
    schema_name: String,
    schema_dir: Option<PathBuf>,
    cache: SchemaCache,
}

impl SchemaResolver {
    pub fn new(schema_name: impl Into<String>, schema_dir: Option<PathBuf>, ttl: Duration) -> Self {
        SchemaResolver {
            schema_name: schema_name.into(),
            schema_dir,
            cache: SchemaCache::new(ttl),
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Resolve one table. Runs on the caller's connection (normally the request transaction).
    pub async fn resolve(&self, conn: &mut PgConnection, table: &str) -> Result<Arc<TableSchema>, AppError> {
        let table = normalize_table_name(table)?;
        let introspected = self.introspected(conn, &table).await?;
        Ok(self.with_definition(&table, introspected).await)
    }

    /// Resolve for read-only queries: a table or view without a primary key still resolves.
    /// Keyed tables go through the shared cache; keyless ones are introspected each time.
    pub async fn resolve_columns(&self, conn: &mut PgConnection, table: &str) -> Result<Arc<TableSchema>, AppError> {
        let table = normalize_table_name(table)?;
        if let Some(hit) = self.cache.get(&table) {
            return Ok(self.with_definition(&table, hit).await);
        }
        let pk = introspect_primary_key(conn, &self.schema_name, &table).await?;
        let schema = match pk {
            Some(_) => self.introspected(conn, &table).await?,
            None => {
                tracing::info!(schema = %self.schema_name, table = %table, "introspecting keyless table");
                let columns = introspect_columns(conn, &self.schema_name, &table).await?;
                Arc::new(columns_from_catalog(&self.schema_name, &table, columns, "")?)
            }
        };
        Ok(self.with_definition(&table, schema).await)
    }

    async fn with_definition(&self, table: &str, introspected: Arc<TableSchema>) -> Arc<TableSchema> {
        let Some(dir) = &self.schema_dir else {
            return introspected;
        };
        match load_definition(dir, table).await {
            Some(def) => {
                tracing::debug!(table = %table, "applying schema file");
                Arc::new(def.apply_to((*introspected).clone()))
            }
            None => introspected,
        }
    }

    async fn introspected(&self, conn: &mut PgConnection, table: &str) -> Result<Arc<TableSchema>, AppError> {
        if let Some(hit) = self.cache.get(table) {
            return Ok(hit);
        }
        tracing::info!(schema = %self.schema_name, table = %table, "introspecting table");
        let schema = Arc::new(introspect_table(conn, &self.schema_name, table).await?);
        self.cache.insert(table, Arc::clone(&schema));
        Ok(schema)
    }
}

/// Trimmed, lower-cased table name that is safe to use as an identifier.
pub fn normalize_table_name(raw: &str) -> Result<String, AppError> {
    let table = raw.trim().to_lowercase();
    if table.is_empty() {
        return Err(AppError::validation("table", "required"));
    }
    if !is_safe_ident(&table) {
        return Err(AppError::validation("table", "invalid"));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn table_names_are_normalized() {
        assert_eq!(normalize_table_name("  Pasien ").unwrap(), "pasien");
    }

    #[test]
    fn blank_and_unsafe_names_are_rejected() {
        let err = normalize_table_name("   ").unwrap_err();
        assert_eq!(err.field_errors().unwrap()["table"], "required");
        let err = normalize_table_name("pasien;drop").unwrap_err();
        assert_eq!(err.field_errors().unwrap()["table"], "invalid");
    }

    #[test]
    fn cached_snapshot_is_shared() {
        let resolver = SchemaResolver::new("public", None, Duration::from_secs(60));
        let snapshot = Arc::new(TableSchema::new("public", "menu", "id", &["id", "company_id"]));
        resolver.cache().insert("menu", Arc::clone(&snapshot));
        assert!(Arc::ptr_eq(&resolver.cache().get("menu").unwrap(), &snapshot));
    }
}
