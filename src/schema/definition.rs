//! Declarative per-table schema files: `<SCHEMA_DIR>/<table>.txt`, line-oriented `key=value`.
//!
//! ```text
//! # pasien
//! primary_key=kd_ps
//! timestamps=true
//! aliases=com_id:company_id
//! fillable=nama_ps,alamat
//! columns=kd_ps,nama_ps,alamat,company_id,created_at,updated_at
//! casts=company_id:int,created_at:datetime
//! ```

use crate::schema::{CastKind, TableSchema};
use std::collections::HashMap;
use std::path::Path;

/// Parsed definition file. Every field is optional; omitted parts come from introspection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaDefinition {
    pub primary_key: Option<String>,
    pub timestamps: Option<bool>,
    pub fillable: Vec<String>,
    pub columns: Vec<String>,
    pub aliases: HashMap<String, String>,
    pub casts: HashMap<String, CastKind>,
}

impl SchemaDefinition {
    pub fn parse(raw: &str) -> Self {
        let mut def = SchemaDefinition::default();
        for line in raw.lines() {
            let s = line.trim();
            if s.is_empty() || s.starts_with('#') || s.starts_with("//") {
                continue;
            }
            let Some((key, val)) = s.split_once('=') else { continue };
            let val = val.trim();
            match key.trim().to_lowercase().as_str() {
                "primary_key" | "pk" => {
                    if !val.is_empty() {
                        def.primary_key = Some(val.to_string());
                    }
                }
                "timestamps" => {
                    let v = val.to_lowercase();
                    def.timestamps = Some(matches!(v.as_str(), "1" | "true" | "yes" | "y"));
                }
                "fillable" => def.fillable = split_csv(val),
                "columns" => def.columns = split_csv(val),
                "aliases" => {
                    for (external, column) in split_pairs(val) {
                        def.aliases.insert(external, column);
                    }
                }
                "casts" => {
                    for (column, kind) in split_pairs(val) {
                        match kind.parse::<CastKind>() {
                            Ok(kind) => {
                                def.casts.insert(column, kind);
                            }
                            Err(e) => tracing::debug!(column = %column, "ignoring cast: {}", e),
                        }
                    }
                }
                _ => {}
            }
        }
        def
    }

    /// Overlay this definition on an introspected schema. Casts merge per column, file wins.
    pub fn apply_to(&self, mut schema: TableSchema) -> TableSchema {
        if let Some(pk) = &self.primary_key {
            schema.primary_key = pk.clone();
        }
        if !self.columns.is_empty() {
            schema.columns = self.columns.clone();
        }
        if !self.fillable.is_empty() {
            schema.fillable = self.fillable.clone();
        }
        if !self.aliases.is_empty() {
            schema.aliases = self.aliases.clone();
        }
        for (column, kind) in &self.casts {
            schema.casts.insert(column.clone(), *kind);
        }
        if let Some(ts) = self.timestamps {
            schema.timestamps = ts;
        }
        schema
    }
}

/// Read `<dir>/<table>.txt`. Unreadable files count as absent.
pub async fn load_definition(dir: &Path, table: &str) -> Option<SchemaDefinition> {
    let path = dir.join(format!("{}.txt", table));
    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => Some(SchemaDefinition::parse(&raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "schema file unreadable, falling back to introspection");
            None
        }
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_pairs(s: &str) -> Vec<(String, String)> {
    split_csv(s)
        .into_iter()
        .filter_map(|kv| {
            let (k, v) = kv.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                None
            } else {
                Some((k.to_string(), v.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PASIEN: &str = "\
# pasien
// legacy tenant alias
primary_key=kd_ps
timestamps=yes

aliases=com_id:company_id, name:nama_ps
fillable=nama_ps,alamat
columns=kd_ps, nama_ps ,alamat,company_id,created_at,updated_at
casts=company_id:int,created_at:datetime,updated_at:DateTime,alamat:uuid
garbage line without equals
";

    #[test]
    fn parses_all_known_keys() {
        let def = SchemaDefinition::parse(PASIEN);
        assert_eq!(def.primary_key.as_deref(), Some("kd_ps"));
        assert_eq!(def.timestamps, Some(true));
        assert_eq!(def.fillable, vec!["nama_ps", "alamat"]);
        assert_eq!(
            def.columns,
            vec!["kd_ps", "nama_ps", "alamat", "company_id", "created_at", "updated_at"]
        );
        assert_eq!(def.aliases.get("com_id").map(String::as_str), Some("company_id"));
        assert_eq!(def.aliases.get("name").map(String::as_str), Some("nama_ps"));
        assert_eq!(def.casts.get("company_id"), Some(&CastKind::Int));
        assert_eq!(def.casts.get("updated_at"), Some(&CastKind::DateTime));
        assert!(!def.casts.contains_key("alamat"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(SchemaDefinition::parse("# nothing\n\n"), SchemaDefinition::default());
    }

    #[test]
    fn pk_shorthand_and_false_timestamps() {
        let def = SchemaDefinition::parse("pk = id\ntimestamps=0");
        assert_eq!(def.primary_key.as_deref(), Some("id"));
        assert_eq!(def.timestamps, Some(false));
    }

    #[test]
    fn overlay_keeps_introspected_parts_and_merges_casts() {
        let introspected = TableSchema::new("public", "pasien", "kd_ps", &["kd_ps", "nama_ps", "company_id"])
            .with_cast("kd_ps", CastKind::String)
            .with_cast("company_id", CastKind::String);
        let def = SchemaDefinition::parse("casts=company_id:int\nfillable=nama_ps");
        let merged = def.apply_to(introspected);
        assert_eq!(merged.primary_key, "kd_ps");
        assert_eq!(merged.columns, vec!["kd_ps", "nama_ps", "company_id"]);
        assert_eq!(merged.cast_of("company_id"), Some(CastKind::Int));
        assert_eq!(merged.cast_of("kd_ps"), Some(CastKind::String));
        assert_eq!(merged.fillable, vec!["nama_ps"]);
        assert!(!merged.timestamps);
    }

    #[tokio::test]
    async fn missing_file_is_absent() {
        let dir = std::env::temp_dir().join("tenant_query_no_such_dir");
        assert!(load_definition(&dir, "pasien").await.is_none());
    }

    #[tokio::test]
    async fn reads_file_from_directory() {
        let dir = std::env::temp_dir().join(format!("tenant_query_defs_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("menu.txt"), "primary_key=id\ncolumns=id,menu_name,company_id\n")
            .await
            .unwrap();
        let def = load_definition(&dir, "menu").await.unwrap();
        assert_eq!(def.primary_key.as_deref(), Some("id"));
        assert_eq!(def.columns.len(), 3);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
