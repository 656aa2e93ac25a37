//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved table schema.

use crate::dsl::Direction;
use crate::error::{AppError, FieldErrors};
use crate::schema::TableSchema;
use crate::service::cast::cast_optional;
use crate::service::NormalizedRecord;
use crate::sql::page::{PageParams, PageRequest};
use crate::sql::{qualified_table, quoted, SqlValue};
use crate::tenant::TenantScope;
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its `$n` placeholder.
    pub fn push_param(&mut self, v: SqlValue) -> String {
        self.params.push(v);
        format!("${}", self.params.len())
    }
}

/// One select-list entry. Numeric and user-defined types come back as text so the row decoder can read them.
pub(crate) fn column_expr(schema: &TableSchema, qualifier: Option<&str>, column: &str) -> String {
    let q = match qualifier {
        Some(a) => format!("{}.{}", quoted(a), quoted(column)),
        None => quoted(column),
    };
    if schema.selects_as_text(column) {
        format!("{}::text AS {}", q, quoted(column))
    } else {
        q
    }
}

/// Qualified select-list entry under an explicit output name.
pub(crate) fn column_expr_as(schema: &TableSchema, qualifier: &str, column: &str, output: &str) -> String {
    let cast = if schema.selects_as_text(column) { "::text" } else { "" };
    format!("{}.{}{} AS {}", quoted(qualifier), quoted(column), cast, quoted(output))
}

fn select_column_list(schema: &TableSchema, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| column_expr(schema, None, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn table_of(schema: &TableSchema) -> String {
    qualified_table(&schema.schema_name, &schema.table)
}

fn all_columns(schema: &TableSchema) -> Vec<&str> {
    schema.columns.iter().map(String::as_str).collect()
}

/// `"tenant" = $a AND "pk" = $b`
fn scoped_pk_predicate(q: &mut QueryBuf, schema: &TableSchema, scope: &TenantScope, pk: &SqlValue) -> String {
    let t = schema.placeholder(&scope.column, q.push_param(scope.value.clone()));
    let p = schema.placeholder(&schema.primary_key, q.push_param(pk.clone()));
    format!(
        "{} = {} AND {} = {}",
        quoted(&scope.column),
        t,
        quoted(&schema.primary_key),
        p
    )
}

/// INSERT ... RETURNING pk. An empty record inserts defaults.
pub fn insert(schema: &TableSchema, record: &NormalizedRecord) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = table_of(schema);
    let returning = column_expr(schema, None, &schema.primary_key);
    if record.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(record.len());
    let mut placeholders = Vec::with_capacity(record.len());
    for (col, val) in record.iter() {
        cols.push(quoted(col));
        let ph = q.push_param(val.clone());
        placeholders.push(schema.placeholder(col, ph));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// SELECT one row by primary key within the tenant scope.
pub fn select_by_pk(schema: &TableSchema, scope: &TenantScope, pk: &SqlValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = select_column_list(schema, &all_columns(schema));
    let pred = scoped_pk_predicate(&mut q, schema, scope, pk);
    q.sql = format!("SELECT {} FROM {} WHERE {} LIMIT 1", cols, table_of(schema), pred);
    q
}

/// UPDATE by primary key within the tenant scope. The tenant column is never assigned.
pub fn update_by_pk(schema: &TableSchema, scope: &TenantScope, pk: &SqlValue, record: &NormalizedRecord) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = table_of(schema);
    let mut sets = Vec::new();
    for (col, val) in record.iter() {
        if col == schema.primary_key || col == scope.column {
            continue;
        }
        let ph = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(col), schema.placeholder(col, ph)));
    }
    if sets.is_empty() {
        // Nothing to assign: still report whether the row exists.
        let pred = scoped_pk_predicate(&mut q, schema, scope, pk);
        q.sql = format!("SELECT {} FROM {} WHERE {}", quoted(&schema.primary_key), table, pred);
        return q;
    }
    let pred = scoped_pk_predicate(&mut q, schema, scope, pk);
    q.sql = format!("UPDATE {} SET {} WHERE {}", table, sets.join(", "), pred);
    q
}

/// DELETE by primary key within the tenant scope.
pub fn delete_by_pk(schema: &TableSchema, scope: &TenantScope, pk: &SqlValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pred = scoped_pk_predicate(&mut q, schema, scope, pk);
    q.sql = format!("DELETE FROM {} WHERE {}", table_of(schema), pred);
    q
}

/// Page query plus a matching count query (same filters, no ordering or window).
pub struct PageQuery {
    pub page: QueryBuf,
    pub count: QueryBuf,
}

/// Generic filter/page request:
/// `SELECT cols FROM t WHERE tenant [AND eq..] [AND like..] [AND (or_where.. OR or_like..)] [ORDER BY ..] LIMIT $n OFFSET $m`.
pub fn select_page(
    schema: &TableSchema,
    scope: &TenantScope,
    req: &PageRequest,
    paging: &PageParams,
) -> Result<PageQuery, AppError> {
    let cols = resolve_select(schema, req.select.as_deref())?;
    let mut filter = QueryBuf::new();
    let where_clause = filter_clause(&mut filter, schema, scope, req)?;
    let order_clause = order_clause(schema, req)?;
    let table = table_of(schema);

    let count = QueryBuf {
        sql: format!("SELECT COUNT(*) AS total FROM {} WHERE {}", table, where_clause),
        params: filter.params.clone(),
    };

    let mut page = filter;
    let limit = page.push_param(SqlValue::Int(paging.limit));
    let offset = page.push_param(SqlValue::Int(paging.offset));
    page.sql = format!(
        "SELECT {} FROM {} WHERE {}{} LIMIT {} OFFSET {}",
        select_column_list(schema, &cols),
        table,
        where_clause,
        order_clause,
        limit,
        offset
    );
    Ok(PageQuery { page, count })
}

/// Requested columns after alias resolution, de-duplicated in request order. None or empty means all columns.
fn resolve_select<'a>(schema: &'a TableSchema, select: Option<&'a [String]>) -> Result<Vec<&'a str>, AppError> {
    let requested = match select {
        Some(list) if !list.is_empty() => list,
        _ => return Ok(all_columns(schema)),
    };
    let mut errors = FieldErrors::new();
    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for raw in requested {
        let col = schema.resolve_alias(raw);
        if col.is_empty() || !seen.insert(col) {
            continue;
        }
        if !schema.has_column(col) {
            errors.insert(raw.clone(), "unknown field".into());
            continue;
        }
        cols.push(col);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if cols.is_empty() {
        return Err(AppError::validation("select", "empty"));
    }
    Ok(cols)
}

fn known_column<'a>(schema: &'a TableSchema, key: &'a str) -> Result<&'a str, AppError> {
    let col = schema.resolve_alias(key);
    if schema.has_column(col) {
        Ok(col)
    } else {
        Err(AppError::validation(key, "unknown field"))
    }
}

fn eq_predicate(q: &mut QueryBuf, schema: &TableSchema, key: &str, value: &Value) -> Result<String, AppError> {
    let col = known_column(schema, key)?;
    if value.is_null() {
        return Ok(format!("{} IS NULL", quoted(col)));
    }
    let v = cast_optional(schema.cast_of(col), value).map_err(|reason| AppError::validation(key, reason))?;
    let ph = q.push_param(v);
    Ok(format!("{} = {}", quoted(col), schema.placeholder(col, ph)))
}

/// `%value%` unless the caller already placed a wildcard.
pub(crate) fn like_pattern(value: &Value) -> String {
    let s = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if s.contains('%') {
        s
    } else {
        format!("%{}%", s)
    }
}

fn like_predicate(q: &mut QueryBuf, schema: &TableSchema, key: &str, value: &Value) -> Result<Option<String>, AppError> {
    let col = known_column(schema, key)?;
    if value.is_null() {
        return Ok(None);
    }
    let ph = q.push_param(SqlValue::Text(like_pattern(value)));
    Ok(Some(format!("CAST({} AS TEXT) ILIKE {}", quoted(col), ph)))
}

fn entries(map: &Option<Map<String, Value>>) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().flat_map(|m| m.iter())
}

fn filter_clause(q: &mut QueryBuf, schema: &TableSchema, scope: &TenantScope, req: &PageRequest) -> Result<String, AppError> {
    let tenant = schema.placeholder(&scope.column, q.push_param(scope.value.clone()));
    let mut parts = vec![format!("{} = {}", quoted(&scope.column), tenant)];

    for (k, v) in entries(&req.where_eq) {
        parts.push(eq_predicate(q, schema, k, v)?);
    }
    for (k, v) in entries(&req.like) {
        if let Some(p) = like_predicate(q, schema, k, v)? {
            parts.push(p);
        }
    }

    let mut any = Vec::new();
    for (k, v) in entries(&req.or_where) {
        any.push(eq_predicate(q, schema, k, v)?);
    }
    for (k, v) in entries(&req.or_like) {
        if let Some(p) = like_predicate(q, schema, k, v)? {
            any.push(p);
        }
    }
    if !any.is_empty() {
        parts.push(format!("({})", any.join(" OR ")));
    }
    Ok(parts.join(" AND "))
}

fn order_clause(schema: &TableSchema, req: &PageRequest) -> Result<String, AppError> {
    if req.order_by.is_empty() {
        return Ok(String::new());
    }
    let mut errors = FieldErrors::new();
    let mut parts = Vec::with_capacity(req.order_by.len());
    for (i, ob) in req.order_by.iter().enumerate() {
        let field = schema.resolve_alias(&ob.field);
        if field.is_empty() {
            errors.insert(format!("order_by[{}].field", i), "required".into());
            continue;
        }
        if !schema.has_column(field) {
            errors.insert(ob.field.trim().to_string(), "unknown field".into());
            continue;
        }
        let dir = if ob.dir.trim().is_empty() {
            Direction::Asc
        } else {
            match Direction::parse(&ob.dir) {
                Some(d) => d,
                None => {
                    errors.insert(format!("order_by[{}].dir", i), "must be asc or desc".into());
                    continue;
                }
            }
        };
        parts.push(format!("{} {}", quoted(field), dir.as_sql()));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}
