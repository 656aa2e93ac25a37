//! Loose input values -> typed column values.

use crate::schema::CastKind;
use crate::sql::SqlValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// `YYYY-MM-DD HH:MM:SS`, the profile used by most stored timestamps.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Coerce `value` for a column of the given kind. The error is the per-field reason.
pub fn cast_value(kind: CastKind, value: &Value) -> Result<SqlValue, &'static str> {
    if value.is_null() {
        return Ok(SqlValue::Null(kind));
    }
    match kind {
        CastKind::String => Ok(SqlValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        CastKind::Int => cast_int(value),
        CastKind::Float => cast_float(value),
        CastKind::Bool => cast_bool(value),
        CastKind::DateTime => cast_datetime(value),
        CastKind::Json => Ok(cast_json(value)),
    }
}

/// Cast with the declared kind when there is one, otherwise infer from the JSON shape.
pub fn cast_optional(kind: Option<CastKind>, value: &Value) -> Result<SqlValue, &'static str> {
    match kind {
        Some(kind) => cast_value(kind, value),
        None => Ok(SqlValue::infer(value)),
    }
}

fn cast_int(value: &Value) -> Result<SqlValue, &'static str> {
    const ERR: &str = "must be an integer";
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Int(i))
            } else if let Some(f) = n.as_f64().filter(|f| fits_i64(*f)) {
                Ok(SqlValue::Int(f.trunc() as i64))
            } else {
                Err(ERR)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(SqlValue::Null(CastKind::Int));
            }
            s.parse::<i64>().map(SqlValue::Int).map_err(|_| ERR)
        }
        _ => Err(ERR),
    }
}

fn fits_i64(f: f64) -> bool {
    f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn cast_float(value: &Value) -> Result<SqlValue, &'static str> {
    const ERR: &str = "must be a number";
    match value {
        Value::Number(n) => n.as_f64().map(SqlValue::Float).ok_or(ERR),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(SqlValue::Null(CastKind::Float));
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(SqlValue::Float(f)),
                _ => Err(ERR),
            }
        }
        _ => Err(ERR),
    }
}

fn cast_bool(value: &Value) -> Result<SqlValue, &'static str> {
    const ERR: &str = "must be a boolean";
    match value {
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "" => Ok(SqlValue::Null(CastKind::Bool)),
            "1" | "true" | "yes" | "y" => Ok(SqlValue::Bool(true)),
            "0" | "false" | "no" | "n" => Ok(SqlValue::Bool(false)),
            _ => Err(ERR),
        },
        _ => Err(ERR),
    }
}

/// Objects and arrays bind as-is. A string holding a JSON document is decoded; any other string is a JSON string.
fn cast_json(value: &Value) -> SqlValue {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(doc @ (Value::Object(_) | Value::Array(_))) => SqlValue::Json(doc),
            _ => SqlValue::Json(value.clone()),
        },
        other => SqlValue::Json(other.clone()),
    }
}

fn cast_datetime(value: &Value) -> Result<SqlValue, &'static str> {
    const ERR: &str = "must be a datetime";
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(SqlValue::Null(CastKind::DateTime));
            }
            parse_datetime(s).map(SqlValue::Timestamp).ok_or(ERR)
        }
        _ => Err(ERR),
    }
}

/// Tries RFC 3339 (with and without fraction), `date time`, then bare date. Zone-less input is UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    // chrono's RFC 3339 parser accepts an optional fraction, covering both profiles.
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT) {
        return Some(t.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn null_is_no_value_for_every_kind() {
        for kind in [
            CastKind::String,
            CastKind::Int,
            CastKind::Float,
            CastKind::Bool,
            CastKind::DateTime,
            CastKind::Json,
        ] {
            assert_eq!(cast_value(kind, &Value::Null), Ok(SqlValue::Null(kind)));
        }
    }

    #[test]
    fn int_accepts_numbers_and_numeric_strings() {
        assert_eq!(cast_value(CastKind::Int, &json!(42)), Ok(SqlValue::Int(42)));
        assert_eq!(cast_value(CastKind::Int, &json!(3.9)), Ok(SqlValue::Int(3)));
        assert_eq!(cast_value(CastKind::Int, &json!(" 17 ")), Ok(SqlValue::Int(17)));
        assert_eq!(cast_value(CastKind::Int, &json!("  ")), Ok(SqlValue::Null(CastKind::Int)));
        assert_eq!(cast_value(CastKind::Int, &json!(-2.5)), Ok(SqlValue::Int(-2)));
    }

    #[test]
    fn int_rejects_floats_outside_i64() {
        assert_eq!(cast_value(CastKind::Int, &json!(1e30)), Err("must be an integer"));
        assert_eq!(cast_value(CastKind::Int, &json!(-1e30)), Err("must be an integer"));
        assert_eq!(cast_value(CastKind::Int, &json!(9.3e18)), Err("must be an integer"));
    }

    #[test]
    fn json_keeps_documents() {
        assert_eq!(cast_value(CastKind::Json, &json!({"a": 1})), Ok(SqlValue::Json(json!({"a": 1}))));
        assert_eq!(cast_value(CastKind::Json, &json!([1, 2])), Ok(SqlValue::Json(json!([1, 2]))));
        assert_eq!(cast_value(CastKind::Json, &json!(r#"{"a": 1}"#)), Ok(SqlValue::Json(json!({"a": 1}))));
        assert_eq!(cast_value(CastKind::Json, &json!("plain")), Ok(SqlValue::Json(json!("plain"))));
        assert_eq!(cast_value(CastKind::Json, &json!(3)), Ok(SqlValue::Json(json!(3))));
        assert_eq!(cast_value(CastKind::Int, &json!("12a")), Err("must be an integer"));
        assert_eq!(cast_value(CastKind::Int, &json!(true)), Err("must be an integer"));
    }

    #[test]
    fn float_mirrors_int() {
        assert_eq!(cast_value(CastKind::Float, &json!(2)), Ok(SqlValue::Float(2.0)));
        assert_eq!(cast_value(CastKind::Float, &json!("2.5")), Ok(SqlValue::Float(2.5)));
        assert_eq!(cast_value(CastKind::Float, &json!("")), Ok(SqlValue::Null(CastKind::Float)));
        assert_eq!(cast_value(CastKind::Float, &json!("abc")), Err("must be a number"));
        assert_eq!(cast_value(CastKind::Float, &json!([1])), Err("must be a number"));
    }

    #[test]
    fn bool_word_sets() {
        for t in ["1", "true", "YES", " y "] {
            assert_eq!(cast_value(CastKind::Bool, &json!(t)), Ok(SqlValue::Bool(true)), "{}", t);
        }
        for f in ["0", "False", "no", "N"] {
            assert_eq!(cast_value(CastKind::Bool, &json!(f)), Ok(SqlValue::Bool(false)), "{}", f);
        }
        assert_eq!(cast_value(CastKind::Bool, &json!(false)), Ok(SqlValue::Bool(false)));
        assert_eq!(cast_value(CastKind::Bool, &json!("maybe")), Err("must be a boolean"));
        assert_eq!(cast_value(CastKind::Bool, &json!(1)), Err("must be a boolean"));
    }

    #[test]
    fn string_stringifies() {
        assert_eq!(cast_value(CastKind::String, &json!("Budi")), Ok(SqlValue::Text("Budi".into())));
        assert_eq!(cast_value(CastKind::String, &json!(10)), Ok(SqlValue::Text("10".into())));
        assert_eq!(cast_value(CastKind::String, &json!(true)), Ok(SqlValue::Text("true".into())));
    }

    #[test]
    fn datetime_profiles_in_order() {
        let expect = |s: &str| match cast_value(CastKind::DateTime, &json!(s)) {
            Ok(SqlValue::Timestamp(t)) => t,
            other => panic!("{}: {:?}", s, other),
        };
        assert_eq!(expect("2024-03-01T10:20:30.123456Z").timestamp_subsec_micros(), 123456);
        assert_eq!(expect("2024-03-01T10:20:30+07:00").to_rfc3339(), "2024-03-01T03:20:30+00:00");
        assert_eq!(expect("2024-03-01 10:20:30").to_rfc3339(), "2024-03-01T10:20:30+00:00");
        assert_eq!(expect("2024-03-01").to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(cast_value(CastKind::DateTime, &json!("01/03/2024")), Err("must be a datetime"));
        assert_eq!(cast_value(CastKind::DateTime, &json!(1700000000)), Err("must be a datetime"));
    }

    #[test]
    fn datetime_round_trips_in_date_space_time_profile() {
        for raw in ["2024-03-01 10:20:30", "1999-12-31 23:59:59", "2024-02-29 00:00:00"] {
            let Ok(SqlValue::Timestamp(t)) = cast_value(CastKind::DateTime, &json!(raw)) else {
                panic!("{}", raw);
            };
            let formatted = t.format(DATE_TIME_FORMAT).to_string();
            assert_eq!(formatted, raw);
            assert_eq!(cast_value(CastKind::DateTime, &json!(formatted)), Ok(SqlValue::Timestamp(t)));
        }
    }

    #[test]
    fn undeclared_columns_are_inferred() {
        assert_eq!(cast_optional(None, &json!(5)), Ok(SqlValue::Int(5)));
        assert_eq!(cast_optional(Some(CastKind::String), &json!(5)), Ok(SqlValue::Text("5".into())));
    }
}
