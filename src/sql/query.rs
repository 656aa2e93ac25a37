//! Query expression -> tenant-enforced SELECT.

use crate::dsl::{ColumnRef, Operator, QuerySpec};
use crate::error::AppError;
use crate::schema::TableSchema;
use crate::service::cast::cast_optional;
use crate::sql::builder::{column_expr, column_expr_as, like_pattern};
use crate::sql::{is_safe_ident, qualified_table, quoted, QueryBuf, SqlValue};
use crate::tenant::{TenantColumns, TenantId, TenantScope};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolved schemas for the tables a query references, keyed by table name.
pub type SchemaSet = HashMap<String, Arc<TableSchema>>;

struct Bound<'a> {
    alias: &'a str,
    schema: &'a TableSchema,
}

struct Resolved<'a> {
    alias: &'a str,
    schema: &'a TableSchema,
    column: &'a str,
}

impl Resolved<'_> {
    fn sql(&self) -> String {
        format!("{}.{}", quoted(self.alias), quoted(self.column))
    }
}

/// Validate `spec` against `schemas` and render it. Fails before producing any SQL when the base table
/// has no tenant column.
pub fn build_query(
    spec: &QuerySpec,
    tenant: &TenantId,
    schemas: &SchemaSet,
    tenant_columns: &TenantColumns,
) -> Result<QueryBuf, AppError> {
    if !is_safe_ident(&spec.table) {
        return Err(AppError::validation("table", "invalid"));
    }
    if !is_safe_ident(&spec.alias) {
        return Err(AppError::validation("table", "invalid alias"));
    }
    let base: &TableSchema = schemas
        .get(&spec.table)
        .ok_or_else(|| AppError::validation("table", "unknown"))?;

    let mut bound = vec![Bound {
        alias: &spec.alias,
        schema: base,
    }];
    for (i, j) in spec.joins.iter().enumerate() {
        let key = format!("joins[{}].table", i);
        if !is_safe_ident(&j.table) || !is_safe_ident(&j.alias) {
            return Err(AppError::validation(key, "invalid"));
        }
        if bound.iter().any(|b| b.alias == j.alias) {
            return Err(AppError::validation("join", "duplicate alias"));
        }
        let schema: &TableSchema = schemas.get(&j.table).ok_or_else(|| AppError::validation(key, "unknown"))?;
        bound.push(Bound {
            alias: &j.alias,
            schema,
        });
    }

    // Base table first, so a table without tenant support never yields SQL.
    tenant_columns.require(base)?;
    let mut scopes = Vec::new();
    for b in &bound {
        if tenant_columns.column_for(b.schema).is_some() {
            scopes.push((b, TenantScope::for_schema(b.schema, tenant_columns, tenant)?));
        }
    }

    let select = if spec.select.is_empty() {
        base.columns
            .iter()
            .map(|c| column_expr(base, Some(&spec.alias), c))
            .collect::<Vec<_>>()
    } else {
        // Row objects are keyed by output name: a repeated column name from another alias comes out as `alias_column`.
        let mut cols = Vec::with_capacity(spec.select.len());
        let mut picked = HashSet::new();
        let mut names = HashSet::new();
        for r in &spec.select {
            let res = resolve_ref(&bound, &spec.alias, r)?;
            if !picked.insert((res.alias, res.column)) {
                continue;
            }
            if names.insert(res.column.to_string()) {
                cols.push(column_expr(res.schema, Some(res.alias), res.column));
                continue;
            }
            let output = format!("{}_{}", res.alias, res.column);
            if !names.insert(output.clone()) {
                return Err(AppError::validation(r.raw.clone(), "duplicate column name"));
            }
            cols.push(column_expr_as(res.schema, res.alias, res.column, &output));
        }
        cols
    };

    let mut q = QueryBuf::new();
    let mut sql = format!(
        "SELECT {} FROM {} AS {}",
        select.join(", "),
        qualified_table(&base.schema_name, &base.table),
        quoted(&spec.alias)
    );
    for (j, b) in spec.joins.iter().zip(bound.iter().skip(1)) {
        let left = resolve_ref(&bound, &spec.alias, &j.left)?;
        let right = resolve_ref(&bound, &spec.alias, &j.right)?;
        sql.push_str(&format!(
            " JOIN {} AS {} ON {} = {}",
            qualified_table(&b.schema.schema_name, &b.schema.table),
            quoted(b.alias),
            left.sql(),
            right.sql()
        ));
    }

    let mut preds = Vec::with_capacity(scopes.len() + spec.wheres.len());
    for (b, scope) in &scopes {
        let ph = b.schema.placeholder(&scope.column, q.push_param(scope.value.clone()));
        preds.push(format!("{}.{} = {}", quoted(b.alias), quoted(&scope.column), ph));
    }
    for w in &spec.wheres {
        let res = resolve_ref(&bound, &spec.alias, &w.column)?;
        let value = w.value.to_json();
        let pred = match w.op {
            Operator::Like => {
                let ph = q.push_param(SqlValue::Text(like_pattern(&value)));
                format!("CAST({} AS TEXT) ILIKE {}", res.sql(), ph)
            }
            op => {
                let v = cast_optional(res.schema.cast_of(res.column), &value)
                    .map_err(|reason| AppError::validation(w.column.raw.clone(), reason))?;
                let ph = res.schema.placeholder(res.column, q.push_param(v));
                format!("{} {} {}", res.sql(), op.as_sql(), ph)
            }
        };
        preds.push(pred);
    }
    sql.push_str(" WHERE ");
    sql.push_str(&preds.join(" AND "));

    if !spec.order_by.is_empty() {
        let mut parts = Vec::with_capacity(spec.order_by.len());
        for o in &spec.order_by {
            parts.push(format!("{} {}", resolve_ref(&bound, &spec.alias, &o.column)?.sql(), o.dir.as_sql()));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&parts.join(", "));
    }

    if let Some(n) = spec.limit.filter(|n| *n > 0) {
        let ph = q.push_param(SqlValue::Int(n));
        sql.push_str(&format!(" LIMIT {}", ph));
    }

    q.sql = sql;
    Ok(q)
}

fn resolve_ref<'a>(bound: &'a [Bound<'a>], base_alias: &'a str, r: &'a ColumnRef) -> Result<Resolved<'a>, AppError> {
    let alias = r.alias.as_deref().unwrap_or(base_alias);
    let b = bound
        .iter()
        .find(|b| b.alias == alias)
        .ok_or_else(|| AppError::validation(r.raw.clone(), "unknown table alias"))?;
    let column = b.schema.resolve_alias(&r.column);
    if !is_safe_ident(column) || !b.schema.has_column(column) {
        return Err(AppError::validation(r.raw.clone(), "unknown field"));
    }
    Ok(Resolved {
        alias: b.alias,
        schema: b.schema,
        column,
    })
}
