//! Catalog introspection via information_schema.

use crate::error::AppError;
use crate::schema::{CastKind, TableSchema};
use crate::sql::qualified_table;
use sqlx::{PgConnection, Row};

/// One row of `information_schema.columns`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
    pub udt_schema: String,
    pub udt_name: String,
}

/// `data_type` values a plain text, integer, float, bool or timestamp parameter can target without a cast.
const NATIVE_PARAM_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "real",
    "double precision",
    "numeric",
    "boolean",
    "text",
    "character varying",
    "character",
    "timestamp with time zone",
    "timestamp without time zone",
    "date",
];

impl CatalogColumn {
    /// Cast target for bound parameters, when the column type needs one.
    fn param_type(&self) -> Option<String> {
        let data_type = self.data_type.to_lowercase();
        if NATIVE_PARAM_TYPES.contains(&data_type.as_str()) {
            return None;
        }
        let udt_name = self.udt_name.trim();
        if udt_name.is_empty() {
            // Arrays and user-defined types are not nameable from data_type alone.
            return match data_type.as_str() {
                "array" | "user-defined" => None,
                _ => Some(data_type),
            };
        }
        match self.udt_schema.trim() {
            "" | "pg_catalog" => Some(udt_name.to_string()),
            schema => Some(qualified_table(schema, udt_name)),
        }
    }
}

/// Columns in ordinal order with their catalog types.
pub async fn introspect_columns(
    conn: &mut PgConnection,
    schema_name: &str,
    table: &str,
) -> Result<Vec<CatalogColumn>, AppError> {
    let rows = sqlx::query(
        r#"
        select column_name::text as column_name, data_type::text as data_type,
               udt_schema::text as udt_schema, udt_name::text as udt_name
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(schema_name)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let mut cols = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("column_name")?;
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let data_type: String = row.try_get("data_type")?;
        let udt_schema: Option<String> = row.try_get("udt_schema")?;
        let udt_name: Option<String> = row.try_get("udt_name")?;
        cols.push(CatalogColumn {
            name,
            data_type: data_type.trim().to_string(),
            udt_schema: udt_schema.unwrap_or_default(),
            udt_name: udt_name.unwrap_or_default(),
        });
    }
    Ok(cols)
}

/// First primary key column by key ordinal, if the table has one.
pub async fn introspect_primary_key(
    conn: &mut PgConnection,
    schema_name: &str,
    table: &str,
) -> Result<Option<String>, AppError> {
    let row = sqlx::query(
        r#"
        select kcu.column_name::text as column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        where tc.constraint_type = 'PRIMARY KEY'
          and tc.table_schema = $1
          and tc.table_name = $2
        order by kcu.ordinal_position
        limit 1
        "#,
    )
    .bind(schema_name)
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(r) => {
            let pk: String = r.try_get("column_name")?;
            let pk = pk.trim().to_string();
            Ok(if pk.is_empty() { None } else { Some(pk) })
        }
        None => Ok(None),
    }
}

/// Build a schema from catalog metadata. Fails with `table: not found` / `primary_key: not found`.
pub fn schema_from_catalog(
    schema_name: &str,
    table: &str,
    columns: Vec<CatalogColumn>,
    primary_key: Option<String>,
) -> Result<TableSchema, AppError> {
    if columns.is_empty() {
        return Err(AppError::validation("table", "not found"));
    }
    let primary_key = primary_key.ok_or_else(|| AppError::validation("primary_key", "not found"))?;
    columns_from_catalog(schema_name, table, columns, &primary_key)
}

/// Schema for read-only use: only the column set is required. A missing key leaves `primary_key` empty.
pub fn columns_from_catalog(
    schema_name: &str,
    table: &str,
    columns: Vec<CatalogColumn>,
    primary_key: &str,
) -> Result<TableSchema, AppError> {
    if columns.is_empty() {
        return Err(AppError::validation("table", "not found"));
    }
    let mut schema = TableSchema::new(schema_name, table, primary_key, &[]);
    for col in columns {
        schema.casts.insert(col.name.clone(), CastKind::from_catalog_type(&col.data_type));
        if let Some(t) = col.param_type() {
            schema.param_types.insert(col.name.clone(), t);
        }
        schema.db_types.insert(col.name.clone(), col.data_type);
        schema.columns.push(col.name);
    }
    schema.timestamps = schema.has_column("created_at") && schema.has_column("updated_at");
    Ok(schema)
}

/// Introspect a table completely.
pub async fn introspect_table(
    conn: &mut PgConnection,
    schema_name: &str,
    table: &str,
) -> Result<TableSchema, AppError> {
    let columns = introspect_columns(conn, schema_name, table).await?;
    if columns.is_empty() {
        return Err(AppError::validation("table", "not found"));
    }
    let pk = introspect_primary_key(conn, schema_name, table).await?;
    schema_from_catalog(schema_name, table, columns, pk)
}
