//! Identity and session subsystem.
//!
//! Three pieces compose here:
//!
//! - **Session manager**: issues and verifies HS256 bearer tokens; owns
//!   the signing secret and the token lifetime policy.
//! - **Extractor**: the request gate parsing `Authorization: Bearer` and
//!   attaching verified claims to the request.
//! - **Access control**: the self-ownership rule binding a token's
//!   subject to the one record it may mutate.
//!
//! Passwords never reach the store in plaintext: they are SHA-256 hashed
//! here and compared as hashes, which preserves the exact-match login
//! contract.

mod access;
mod extractor;
mod session;

pub use access::require_self;
pub use extractor::{BearerClaims, claims_from_header};
pub use session::{Claims, LOGOUT_TTL_SECS, SESSION_TTL_SECS, SessionManager, VerifyError};

use sha2::{Digest, Sha256};

/// Hash a password for storage and comparison (don't store raw passwords).
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
