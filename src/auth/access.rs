//! Access control: a caller may only mutate their own record.

use tracing::debug;

use crate::auth::session::Claims;
use crate::error::{ApiError, ApiResult};
use crate::types::UserId;

/// Require that the token subject owns the target record.
///
/// Exact identifier match; mismatch is `Forbidden` regardless of whether
/// the target record exists. Runs before any store mutation (fail closed).
pub fn require_self(claims: &Claims, target: &UserId) -> ApiResult<()> {
    if claims.id != *target {
        debug!(
            "caller {} denied access to record {}",
            claims.id, target
        );
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
