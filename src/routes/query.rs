//! Query expression route.

use crate::handlers::query::run;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn query_routes(state: AppState) -> Router {
    Router::new().route("/query", post(run)).with_state(state)
}
