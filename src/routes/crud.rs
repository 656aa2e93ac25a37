//! Table CRUD routes.

use crate::handlers::crud::{create, delete, list, read, select, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn crud_routes(state: AppState) -> Router {
    Router::new()
        .route("/crud/:table", get(list).post(create))
        .route("/crud/:table/select", post(select))
        .route("/crud/:table/:pk", get(read).put(update).patch(update).delete(delete))
        .with_state(state)
}
