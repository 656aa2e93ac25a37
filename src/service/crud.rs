//! Tenant-scoped CRUD execution against PostgreSQL.
//!
//! Every operation runs on a caller-supplied connection, normally the request transaction.

use crate::error::AppError;
use crate::schema::TableSchema;
use crate::service::cast::cast_optional;
use crate::service::NormalizedRecord;
use crate::sql::{
    bind_all, delete_by_pk, insert, select_by_pk, select_page, update_by_pk, PageRequest, Paging, QueryBuf, SqlValue,
};
use crate::tenant::TenantScope;
use serde_json::Value;
use sqlx::{PgConnection, Row};

/// One page of rows plus its paging block.
#[derive(Debug)]
pub struct Page {
    pub rows: Vec<Value>,
    pub paging: Paging,
}

pub struct CrudService;

impl CrudService {
    /// Insert one row with the tenant column forced to the scope value. Returns the generated primary key.
    pub async fn insert(
        conn: &mut PgConnection,
        schema: &TableSchema,
        scope: &TenantScope,
        mut record: NormalizedRecord,
    ) -> Result<Value, AppError> {
        record.force(&scope.column, scope.value.clone());
        let q = insert(schema, &record);
        let row = Self::fetch_optional(conn, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        Ok(cell_to_value(&row, &schema.primary_key))
    }

    /// Fetch one row by primary key. Keys owned by another tenant are not found.
    pub async fn find(
        conn: &mut PgConnection,
        schema: &TableSchema,
        scope: &TenantScope,
        pk: &SqlValue,
    ) -> Result<Value, AppError> {
        let q = select_by_pk(schema, scope, pk);
        let row = Self::fetch_optional(conn, &q)
            .await?
            .ok_or_else(|| AppError::not_found(&schema.table, pk))?;
        Ok(row_to_json(&row))
    }

    pub async fn update(
        conn: &mut PgConnection,
        schema: &TableSchema,
        scope: &TenantScope,
        pk: &SqlValue,
        record: &NormalizedRecord,
    ) -> Result<(), AppError> {
        let q = update_by_pk(schema, scope, pk, record);
        if Self::execute(conn, &q).await? == 0 {
            return Err(AppError::not_found(&schema.table, pk));
        }
        Ok(())
    }

    pub async fn delete(
        conn: &mut PgConnection,
        schema: &TableSchema,
        scope: &TenantScope,
        pk: &SqlValue,
    ) -> Result<(), AppError> {
        let q = delete_by_pk(schema, scope, pk);
        if Self::execute(conn, &q).await? == 0 {
            return Err(AppError::not_found(&schema.table, pk));
        }
        Ok(())
    }

    /// Paged SELECT. Over-fetches one row to set `has_more`; runs the count query only when totals are asked for.
    pub async fn select_page(
        conn: &mut PgConnection,
        schema: &TableSchema,
        scope: &TenantScope,
        req: &PageRequest,
        default_per_page: i64,
    ) -> Result<Page, AppError> {
        let params = req.paging(default_per_page);
        let built = select_page(schema, scope, req, &params)?;

        let total = if req.with_total {
            let row = Self::fetch_optional(conn, &built.count)
                .await?
                .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
            Some(row.try_get::<i64, _>("total")?)
        } else {
            None
        };

        let rows = Self::fetch_all(conn, &built.page).await?;
        let (rows, has_more) = split_page(rows, params.per_page);
        Ok(Page {
            rows,
            paging: Paging::new(&params, has_more, total),
        })
    }

    /// Run an already-built read query and return its rows as JSON objects.
    pub async fn fetch_all(conn: &mut PgConnection, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(&q.sql, &q.params).fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<sqlx::postgres::PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(&q.sql, &q.params).fetch_optional(&mut *conn).await?)
    }

    async fn execute(conn: &mut PgConnection, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let done = bind_all(&q.sql, &q.params).execute(&mut *conn).await?;
        Ok(done.rows_affected())
    }
}

/// Cast a primary key taken from a path segment with the key column's cast kind.
pub fn cast_pk(schema: &TableSchema, raw: &str) -> Result<SqlValue, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(&schema.primary_key, "required"));
    }
    cast_optional(schema.cast_of(&schema.primary_key), &Value::String(raw.to_string()))
        .map_err(|reason| AppError::validation(&schema.primary_key, reason))
}

/// Trim an over-fetched result to `per_page` rows; true when a further page exists.
pub fn split_page(mut rows: Vec<Value>, per_page: i64) -> (Vec<Value>, bool) {
    let per_page = usize::try_from(per_page).unwrap_or(0);
    let has_more = rows.len() > per_page;
    rows.truncate(per_page);
    (rows, has_more)
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CastKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn over_fetched_row_sets_has_more() {
        let (rows, more) = split_page(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})], 2);
        assert_eq!(rows, vec![json!({"id": 1}), json!({"id": 2})]);
        assert!(more);
    }

    #[test]
    fn short_page_has_no_more() {
        let (rows, more) = split_page(vec![json!({"id": 1}), json!({"id": 2})], 2);
        assert_eq!(rows.len(), 2);
        assert!(!more);
        let (rows, more) = split_page(vec![], 25);
        assert!(rows.is_empty());
        assert!(!more);
    }

    #[test]
    fn path_keys_use_pk_cast() {
        let schema = TableSchema::new("public", "menu", "id", &["id", "menu_name"]).with_cast("id", CastKind::Int);
        assert_eq!(cast_pk(&schema, " 42 ").unwrap(), SqlValue::Int(42));
        let err = cast_pk(&schema, "abc").unwrap_err();
        assert_eq!(err.field_errors().unwrap()["id"], "must be an integer");
        let err = cast_pk(&schema, " ").unwrap_err();
        assert_eq!(err.field_errors().unwrap()["id"], "required");

        let text_pk = TableSchema::new("public", "pasien", "kd_ps", &["kd_ps"]);
        assert_eq!(cast_pk(&text_pk, "P01").unwrap(), SqlValue::Text("P01".into()));
    }
}
