//! Shared application state for all routes.

use crate::config::Settings;
use crate::schema::SchemaResolver;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Holds the schema cache; shared by every request.
    pub resolver: Arc<SchemaResolver>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let resolver = SchemaResolver::new(
            settings.db_schema.clone(),
            settings.schema_dir.clone(),
            settings.schema_cache_ttl,
        );
        AppState {
            pool,
            resolver: Arc::new(resolver),
            settings: Arc::new(settings),
        }
    }
}
