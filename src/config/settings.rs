//! Environment-driven settings. `.env` is loaded first; real environment variables win.

use crate::config::TablePolicy;
use crate::error::ConfigError;
use crate::sql::is_safe_ident;
use crate::tenant::{TenantColumns, DEFAULT_LEGACY_TENANT_COLUMN, DEFAULT_TENANT_COLUMN};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DB_SCHEMA: &str = "public";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_QUERY_MAX_LIMIT: i64 = 200;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    pub http_addr: SocketAddr,
    /// Database namespace tables are introspected in and qualified with.
    pub db_schema: String,
    /// Directory of `<table>.txt` schema definition files.
    pub schema_dir: Option<PathBuf>,
    pub schema_cache_ttl: Duration,
    pub tenant_columns: TenantColumns,
    pub crud_policy: TablePolicy,
    pub query_policy: TablePolicy,
    pub query_max_limit: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_schema = get("DB_SCHEMA").unwrap_or_else(|| DEFAULT_DB_SCHEMA.to_string());
        if !is_safe_ident(&db_schema) {
            return Err(ConfigError::Invalid {
                key: "DB_SCHEMA",
                value: db_schema,
            });
        }

        let preferred = get("TENANT_COLUMN").unwrap_or_else(|| DEFAULT_TENANT_COLUMN.to_string());
        if !is_safe_ident(&preferred) {
            return Err(ConfigError::Invalid {
                key: "TENANT_COLUMN",
                value: preferred,
            });
        }
        // Present but blank disables the legacy fallback.
        let legacy = match lookup("LEGACY_TENANT_COLUMN") {
            Some(v) => Some(v.trim().to_string()),
            None => Some(DEFAULT_LEGACY_TENANT_COLUMN.to_string()),
        };
        if let Some(l) = legacy.as_deref().filter(|l| !l.is_empty() && !is_safe_ident(l)) {
            return Err(ConfigError::Invalid {
                key: "LEGACY_TENANT_COLUMN",
                value: l.to_string(),
            });
        }

        let ttl_secs: u64 = parse_or(get("SCHEMA_CACHE_TTL_SECS"), "SCHEMA_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let query_max_limit: i64 = parse_or(get("QUERY_MAX_LIMIT"), "QUERY_MAX_LIMIT", DEFAULT_QUERY_MAX_LIMIT)?;
        if query_max_limit <= 0 {
            return Err(ConfigError::Invalid {
                key: "QUERY_MAX_LIMIT",
                value: query_max_limit.to_string(),
            });
        }

        Ok(Settings {
            database_url: get("DATABASE_URL"),
            http_addr: parse_or(get("HTTP_ADDR"), "HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_schema,
            schema_dir: get("SCHEMA_DIR").map(PathBuf::from),
            schema_cache_ttl: Duration::from_secs(ttl_secs),
            tenant_columns: TenantColumns::new(preferred, legacy),
            crud_policy: TablePolicy::parse(&get("CRUD_DENIED_TABLES").unwrap_or_default()),
            query_policy: TablePolicy::parse(&get("QUERY_DENIED_TABLES").unwrap_or_default()),
            query_max_limit,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.database_url, None);
        assert_eq!(s.http_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(s.db_schema, "public");
        assert_eq!(s.schema_dir, None);
        assert_eq!(s.schema_cache_ttl, Duration::from_secs(300));
        assert_eq!(s.tenant_columns, TenantColumns::default());
        assert_eq!(s.query_max_limit, 200);
        assert!(s.crud_policy.allows("pasien"));
        assert!(matches!(s.require_database_url(), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn overrides() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://localhost/lab"),
            ("HTTP_ADDR", "127.0.0.1:8080"),
            ("DB_SCHEMA", "lab"),
            ("SCHEMA_DIR", "./schemas"),
            ("SCHEMA_CACHE_TTL_SECS", "60"),
            ("TENANT_COLUMN", "tenant_id"),
            ("LEGACY_TENANT_COLUMN", ""),
            ("CRUD_DENIED_TABLES", "users"),
            ("QUERY_DENIED_TABLES", "*"),
            ("QUERY_MAX_LIMIT", "50"),
        ])
        .unwrap();
        assert_eq!(s.require_database_url().unwrap(), "postgres://localhost/lab");
        assert_eq!(s.http_addr.port(), 8080);
        assert_eq!(s.db_schema, "lab");
        assert_eq!(s.schema_dir, Some(PathBuf::from("./schemas")));
        assert_eq!(s.schema_cache_ttl, Duration::from_secs(60));
        assert_eq!(s.tenant_columns, TenantColumns::new("tenant_id", None));
        assert!(!s.crud_policy.allows("users"));
        assert!(!s.query_policy.allows("pasien"));
        assert_eq!(s.query_max_limit, 50);
    }

    #[test]
    fn invalid_values_name_the_key() {
        for (key, value) in [
            ("SCHEMA_CACHE_TTL_SECS", "soon"),
            ("QUERY_MAX_LIMIT", "0"),
            ("HTTP_ADDR", "nowhere"),
            ("DB_SCHEMA", "lab;drop"),
            ("TENANT_COLUMN", "company id"),
        ] {
            match settings(&[(key, value)]) {
                Err(ConfigError::Invalid { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{}: {:?}", key, other.map(|_| ())),
            }
        }
    }
}
