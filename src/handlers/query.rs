//! Query expression handler.

use crate::error::AppError;
use crate::extractors::Tenant;
use crate::response::success;
use crate::service::QueryService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    pub query: String,
}

pub async fn run(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|_| AppError::validation("body", "invalid JSON"))?;
    let service = QueryService {
        resolver: &state.resolver,
        policy: &state.settings.query_policy,
        tenant_columns: &state.settings.tenant_columns,
        max_limit: state.settings.query_max_limit,
    };
    let mut tx = state.pool.begin().await?;
    let rows = service.run(&mut *tx, &tenant, &body.query).await?;
    tx.commit().await?;
    Ok(success("OK", rows))
}
