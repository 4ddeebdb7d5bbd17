//! Bearer-token authentication for HTTP requests.
//!
//! The request gate: requires `Authorization: Bearer <token>`. A missing
//! header or wrong scheme is `MissingCredential`; a present but
//! unverifiable token is `InvalidCredential`. On success the resolved
//! claims are attached to the request for the handler.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::debug;

use crate::auth::session::{Claims, SessionManager};
use crate::error::{ApiError, ApiResult};

/// Resolve claims from the raw `Authorization` header value.
pub fn claims_from_header(
    sessions: &SessionManager,
    authorization: Option<&str>,
) -> ApiResult<Claims> {
    let header = authorization.ok_or(ApiError::MissingCredential)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::MissingCredential)?;

    sessions.verify(token).map_err(|e| {
        debug!("rejected bearer token: {}", e);
        ApiError::InvalidCredential
    })
}

/// Extractor attaching verified token claims to a handler.
///
/// Rejection maps straight to the 401 envelope via `ApiError`.
#[derive(Debug, Clone)]
pub struct BearerClaims(pub Claims);

impl<S> FromRequestParts<S> for BearerClaims
where
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionManager>::from_ref(state);
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        claims_from_header(&sessions, authorization).map(BearerClaims)
    }
}
