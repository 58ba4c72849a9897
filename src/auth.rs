//! Owner identity extraction.
//!
//! Authentication happens upstream. The authenticating proxy forwards the
//! principal in the `X-Owner-Id` header, and every handler that touches the
//! ledger takes an [`OwnerId`] argument extracted from it.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::OwnerId;

pub const OWNER_HEADER: &str = "x-owner-id";

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no owner".to_string()))?;

        Ok(OwnerId::new(owner))
    }
}
