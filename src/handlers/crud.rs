//! Table CRUD handlers. Each request runs in one transaction, committed on success.

use crate::error::AppError;
use crate::extractors::Tenant;
use crate::response::{created, paged, success, RowRef};
use crate::service::{cast_pk, normalize_insert, normalize_update, CrudService, TableAccess};
use crate::sql::page::{DEFAULT_PER_PAGE, LIST_PER_PAGE};
use crate::sql::PageRequest;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn access(state: &AppState) -> TableAccess<'_> {
    TableAccess {
        resolver: &state.resolver,
        policy: &state.settings.crud_policy,
        tenant_columns: &state.settings.tenant_columns,
    }
}

fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(Value::Object(m))) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(_) => Err(AppError::validation("body", "invalid JSON")),
    }
}

/// Query-string parameters of the GET list: `page`, `per_page`, `with_total`; every other key is an equality filter.
fn list_request(params: HashMap<String, String>) -> PageRequest {
    let mut req = PageRequest::default();
    let mut filters = Map::new();
    for (k, v) in params {
        match k.as_str() {
            "page" => req.page = v.trim().parse().ok(),
            "per_page" => req.per_page = v.trim().parse().ok(),
            "with_total" => req.with_total = matches!(v.trim(), "1" | "true"),
            _ => {
                filters.insert(k, Value::String(v));
            }
        }
    }
    if !filters.is_empty() {
        req.where_eq = Some(filters);
    }
    req
}

pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(table): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let raw = body_object(body)?;
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let record = normalize_insert(&schema, &raw, &state.settings.tenant_columns)?;
    let pk = CrudService::insert(&mut *tx, &schema, &scope, record).await?;
    tx.commit().await?;
    tracing::info!(table = %schema.table, tenant = %tenant, "row created");
    Ok(created(RowRef {
        table: schema.table.clone(),
        pk,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let req = list_request(params);
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let page = CrudService::select_page(&mut *tx, &schema, &scope, &req, LIST_PER_PAGE).await?;
    tx.commit().await?;
    Ok(paged(page.rows, page.paging))
}

pub async fn select(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(table): Path<String>,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|_| AppError::validation("body", "invalid JSON"))?;
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let page = CrudService::select_page(&mut *tx, &schema, &scope, &req, DEFAULT_PER_PAGE).await?;
    tx.commit().await?;
    Ok(paged(page.rows, page.paging))
}

pub async fn read(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path((table, pk)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let pk = cast_pk(&schema, &pk)?;
    let row = CrudService::find(&mut *tx, &schema, &scope, &pk).await?;
    tx.commit().await?;
    Ok(success("OK", row))
}

pub async fn update(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path((table, pk)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let raw = body_object(body)?;
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let pk = cast_pk(&schema, &pk)?;
    let record = normalize_update(&schema, &raw, &state.settings.tenant_columns)?;
    CrudService::update(&mut *tx, &schema, &scope, &pk, &record).await?;
    tx.commit().await?;
    Ok(success(
        "Updated.",
        RowRef {
            table: schema.table.clone(),
            pk: pk.to_json(),
        },
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path((table, pk)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = state.pool.begin().await?;
    let (schema, scope) = access(&state).open(&mut *tx, &table, &tenant).await?;
    let pk = cast_pk(&schema, &pk)?;
    CrudService::delete(&mut *tx, &schema, &scope, &pk).await?;
    tx.commit().await?;
    tracing::info!(table = %schema.table, tenant = %tenant, pk = %pk, "row deleted");
    Ok(success(
        "Deleted.",
        RowRef {
            table: schema.table.clone(),
            pk: pk.to_json(),
        },
    ))
}
