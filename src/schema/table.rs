//! Resolved table description used by the normalizer, builders and executor.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Catalog types the row decoder reads natively.
const DECODED_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "real",
    "double precision",
    "boolean",
    "text",
    "character varying",
    "character",
    "timestamp with time zone",
    "timestamp without time zone",
    "date",
    "json",
    "jsonb",
];

/// Declared coercion rule for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
    String,
    Int,
    Float,
    Bool,
    DateTime,
    Json,
}

impl CastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastKind::String => "string",
            CastKind::Int => "int",
            CastKind::Float => "float",
            CastKind::Bool => "bool",
            CastKind::DateTime => "datetime",
            CastKind::Json => "json",
        }
    }

    /// Cast kind inferred from an `information_schema.columns.data_type` value.
    pub fn from_catalog_type(data_type: &str) -> Self {
        let t = data_type.trim().to_lowercase();
        if t.starts_with("json") {
            CastKind::Json
        } else if t.contains("interval") || t == "time" || t.starts_with("time ") {
            // Time of day and durations are not instants; they bind as text.
            CastKind::String
        } else if t.contains("int") {
            CastKind::Int
        } else if ["numeric", "decimal", "double", "real", "float"].iter().any(|k| t.contains(k)) {
            CastKind::Float
        } else if t.contains("bool") {
            CastKind::Bool
        } else if t.contains("timestamp") || t.contains("date") || t.contains("time") {
            CastKind::DateTime
        } else {
            CastKind::String
        }
    }
}

impl std::str::FromStr for CastKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(CastKind::String),
            "int" => Ok(CastKind::Int),
            "float" => Ok(CastKind::Float),
            "bool" => Ok(CastKind::Bool),
            "datetime" => Ok(CastKind::DateTime),
            "json" => Ok(CastKind::Json),
            other => Err(format!("unknown cast kind: {}", other)),
        }
    }
}

/// Time source for generated timestamp columns.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    pub fn system() -> Self {
        Clock(Arc::new(Utc::now))
    }

    /// Clock that always reports the same instant.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Clock(Arc::new(move || at))
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::system()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Clock")
    }
}

#[derive(Clone, Debug)]
pub struct TableSchema {
    /// Database namespace the table lives in (e.g. "public").
    pub schema_name: String,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<String>,
    pub casts: HashMap<String, CastKind>,
    /// Explicit fillable list. Empty means all columns except the primary key.
    pub fillable: Vec<String>,
    /// External field name -> real column.
    pub aliases: HashMap<String, String>,
    pub timestamps: bool,
    /// Catalog data type per column when introspected.
    pub db_types: HashMap<String, String>,
    /// SQL type a bound parameter must be cast to for columns the driver cannot target directly
    /// (uuid, json, inet, enums, ...). Already quoted where needed.
    pub param_types: HashMap<String, String>,
    pub clock: Clock,
}

impl TableSchema {
    pub fn new(schema_name: &str, table: &str, primary_key: &str, columns: &[&str]) -> Self {
        TableSchema {
            schema_name: schema_name.to_string(),
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            casts: HashMap::new(),
            fillable: Vec::new(),
            aliases: HashMap::new(),
            timestamps: false,
            db_types: HashMap::new(),
            param_types: HashMap::new(),
            clock: Clock::system(),
        }
    }

    pub fn with_cast(mut self, column: &str, kind: CastKind) -> Self {
        self.casts.insert(column.to_string(), kind);
        self
    }

    pub fn with_alias(mut self, external: &str, column: &str) -> Self {
        self.aliases.insert(external.to_string(), column.to_string());
        self
    }

    pub fn with_fillable(mut self, columns: &[&str]) -> Self {
        self.fillable = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_timestamps(mut self, clock: Clock) -> Self {
        self.timestamps = true;
        self.clock = clock;
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn cast_of(&self, column: &str) -> Option<CastKind> {
        self.casts.get(column).copied()
    }

    /// Alias-resolved column name for a caller-supplied key (trimmed).
    pub fn resolve_alias<'a>(&'a self, key: &'a str) -> &'a str {
        let k = key.trim();
        self.aliases.get(k).map(String::as_str).unwrap_or(k)
    }

    /// Columns writable from caller input. Never contains the primary key.
    pub fn fillable_set(&self) -> BTreeSet<&str> {
        let source: Box<dyn Iterator<Item = &String>> = if self.fillable.is_empty() {
            Box::new(self.columns.iter())
        } else {
            Box::new(self.fillable.iter())
        };
        source
            .map(String::as_str)
            .filter(|c| *c != self.primary_key)
            .collect()
    }

    /// Placeholder for a value bound to `column`, with a type cast when one is needed.
    pub fn placeholder(&self, column: &str, ph: String) -> String {
        match self.param_types.get(column) {
            Some(t) => format!("{}::{}", ph, t),
            None => ph,
        }
    }

    /// True when the row decoder cannot read the column natively and it should be selected as text.
    /// Columns with no known catalog type are read as they are.
    pub fn selects_as_text(&self, column: &str) -> bool {
        self.db_types
            .get(column)
            .map(|t| !DECODED_TYPES.contains(&t.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}
