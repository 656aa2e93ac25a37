//! Caller payloads -> column/value records fit for INSERT and UPDATE.

use crate::error::{AppError, FieldErrors};
use crate::schema::TableSchema;
use crate::service::cast::cast_optional;
use crate::sql::SqlValue;
use crate::tenant::TenantColumns;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// Typed record whose keys are all fillable columns of one schema (plus generated timestamps).
/// Only the normalizer builds one; the executor may add the tenant column on insert.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedRecord {
    values: BTreeMap<String, SqlValue>,
}

impl NormalizedRecord {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn force(&mut self, column: &str, value: SqlValue) {
        self.values.insert(column.to_string(), value);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Insert,
    Update,
}

pub fn normalize_insert(
    schema: &TableSchema,
    raw: &Map<String, Value>,
    tenant: &TenantColumns,
) -> Result<NormalizedRecord, AppError> {
    normalize(schema, raw, tenant, Mode::Insert)
}

pub fn normalize_update(
    schema: &TableSchema,
    raw: &Map<String, Value>,
    tenant: &TenantColumns,
) -> Result<NormalizedRecord, AppError> {
    normalize(schema, raw, tenant, Mode::Update)
}

fn normalize(
    schema: &TableSchema,
    raw: &Map<String, Value>,
    tenant: &TenantColumns,
    mode: Mode,
) -> Result<NormalizedRecord, AppError> {
    let fillable = schema.fillable_set();
    let mut record = NormalizedRecord::default();
    let mut errors = FieldErrors::new();

    for (key, value) in raw {
        if key.trim().is_empty() {
            continue;
        }
        let column = schema.resolve_alias(key);
        if !fillable.contains(column) || tenant.is_tenant_column(column) {
            continue;
        }
        match cast_optional(schema.cast_of(column), value) {
            Ok(v) => record.force(column, v),
            Err(reason) => {
                errors.insert(column.to_string(), reason.to_string());
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if record.is_empty() {
        return Err(AppError::validation("payload", "no fillable fields provided"));
    }

    if schema.timestamps {
        let now = schema.clock.now();
        if mode == Mode::Insert && schema.has_column(CREATED_AT) && record.get(CREATED_AT).is_none() {
            record.force(CREATED_AT, SqlValue::Timestamp(now));
        }
        let set_updated = match mode {
            Mode::Insert => record.get(UPDATED_AT).is_none(),
            Mode::Update => true,
        };
        if set_updated && schema.has_column(UPDATED_AT) {
            record.force(UPDATED_AT, SqlValue::Timestamp(now));
        }
    }
    Ok(record)
}
