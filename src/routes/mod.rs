//! Routers. `app` merges everything behind a request body limit.

mod common;
mod crud;
mod query;

pub use common::{common_routes, common_routes_with_ready};
pub use crud::crud_routes;
pub use query::query_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies above this size are refused with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(crud_routes(state.clone()))
        .merge(query_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
