//! Typed values that can be bound to a PostgreSQL query.

use crate::schema::CastKind;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound as a positional parameter. Produced at the cast boundary; never built from raw caller input elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    /// Typed null: the kind picks the parameter type so the server accepts it for the column.
    Null(CastKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

impl SqlValue {
    /// Value for a column with no declared cast, inferred from the JSON shape.
    pub fn infer(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null(CastKind::String),
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Json(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    pub fn bind_to<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        match self {
            SqlValue::Null(kind) => match kind {
                CastKind::Int => query.bind(None::<i64>),
                CastKind::Float => query.bind(None::<f64>),
                CastKind::Bool => query.bind(None::<bool>),
                CastKind::DateTime => query.bind(None::<DateTime<Utc>>),
                CastKind::String => query.bind(None::<String>),
                CastKind::Json => query.bind(None::<Value>),
            },
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Timestamp(t) => query.bind(*t),
            SqlValue::Json(v) => query.bind(v.clone()),
        }
    }

    /// JSON rendering, used for generated keys and log output.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null(_) => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(n) => Value::Number((*n).into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null(_) => f.write_str("null"),
            SqlValue::Text(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Build a query with every parameter bound in order.
pub fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> PgQuery<'q> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = p.bind_to(query);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn infer_follows_json_shape() {
        assert_eq!(SqlValue::infer(&json!(3)), SqlValue::Int(3));
        assert_eq!(SqlValue::infer(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::infer(&json!("x")), SqlValue::Text("x".into()));
        assert_eq!(SqlValue::infer(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::infer(&json!({"a": 1})), SqlValue::Json(json!({"a": 1})));
        assert!(SqlValue::infer(&Value::Null).is_null());
    }

    #[test]
    fn display_is_plain_for_text() {
        assert_eq!(SqlValue::Text("kd01".into()).to_string(), "kd01");
        assert_eq!(SqlValue::Int(7).to_string(), "7");
    }
}
