//! Extract the tenant id from the `X-Tenant-ID` header.

use crate::error::AppError;
use crate::tenant::TenantId;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Tenant of the caller. Missing or blank header is rejected with 400.
#[derive(Clone, Debug)]
pub struct Tenant(pub TenantId);

#[async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest(format!("missing {} header", TENANT_ID_HEADER)))?;
        Ok(Tenant(TenantId::new(raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use pretty_assertions::assert_eq;

    async fn extract(header: Option<&str>) -> Result<Tenant, AppError> {
        let mut builder = Request::builder().uri("/crud/pasien");
        if let Some(h) = header {
            builder = builder.header(TENANT_ID_HEADER, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Tenant::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_trimmed_header() {
        let Tenant(id) = extract(Some(" 10 ")).await.unwrap();
        assert_eq!(id.as_str(), "10");
    }

    #[tokio::test]
    async fn missing_or_blank_is_bad_request() {
        assert!(matches!(extract(None).await, Err(AppError::BadRequest(_))));
        assert!(matches!(extract(Some("  ")).await, Err(AppError::BadRequest(_))));
    }
}
