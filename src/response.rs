//! Standard response envelope helpers.

use crate::sql::Paging;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{ok, message, data, paging}`; `data` and `paging` are omitted when absent.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// Identifies the row a write touched.
#[derive(Serialize)]
pub struct RowRef {
    pub table: String,
    pub pk: serde_json::Value,
}

pub fn success<T: Serialize>(message: &'static str, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            ok: true,
            message,
            data: Some(data),
            paging: None,
        }),
    )
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            ok: true,
            message: "Created.",
            data: Some(data),
            paging: None,
        }),
    )
}

pub fn paged<T: Serialize>(rows: Vec<T>, paging: Paging) -> (StatusCode, Json<Envelope<Vec<T>>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            ok: true,
            message: "OK",
            data: Some(rows),
            paging: Some(paging),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PageParams;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn paged_envelope_shape() {
        let params = PageParams::new(Some(1), Some(2), 25);
        let (status, Json(body)) = paged(vec![json!({"id": 1})], Paging::new(&params, true, None));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({
                "ok": true,
                "message": "OK",
                "data": [{"id": 1}],
                "paging": {"page": 1, "per_page": 2, "has_more": true}
            })
        );
    }

    #[test]
    fn created_envelope_shape() {
        let (status, Json(body)) = created(RowRef {
            table: "pasien".into(),
            pk: json!(7),
        });
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"ok": true, "message": "Created.", "data": {"table": "pasien", "pk": 7}})
        );
    }
}
