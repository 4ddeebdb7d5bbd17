//! Session token issuance and verification.
//!
//! Tokens are HS256-signed claim sets carrying a snapshot of the user's
//! public fields plus an expiry timestamp. They are stateless: nothing is
//! stored server-side and there is no revocation list. Logout and delete
//! hand the client an already-expired token as a discard signal; the
//! original token stays valid until its natural expiry.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ApiError, ApiResult};
use crate::store::PublicUser;
use crate::types::{Account, UserId};

/// Lifetime of a session token.
pub const SESSION_TTL_SECS: i64 = 30 * 60;

/// Lifetime of the logout/delete signal token. Negative: expired on
/// arrival.
pub const LOGOUT_TTL_SECS: i64 = -10;

/// The claim set embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub account: Account,
    pub name: String,
    pub mail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
}

impl Claims {
    /// Empty claim set for logout/delete signal tokens.
    fn empty(exp: i64) -> Self {
        Self {
            id: UserId::new(""),
            account: Account::new(""),
            name: String::new(),
            mail: String::new(),
            head: None,
            exp,
        }
    }
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The signature does not match the configured secret.
    InvalidSignature,
    /// The token is past its expiry instant.
    Expired,
    /// The token is not a well-formed JWT.
    Malformed(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "token signature is invalid"),
            Self::Expired => write!(f, "token has expired"),
            Self::Malformed(msg) => write!(f, "token is malformed: {}", msg),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Issues and verifies bearer tokens. Owns the signing secret for the
/// process lifetime.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionManager {
    /// Create a manager from the configured signing secret.
    ///
    /// The secret is validated as non-empty at configuration load; this
    /// constructor assumes that already happened.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token carrying the user's public fields, expiring `ttl_secs`
    /// from now. Pure apart from reading the wall clock.
    pub fn issue(&self, user: &PublicUser, ttl_secs: i64) -> ApiResult<String> {
        let claims = Claims {
            id: user.id.clone(),
            account: user.account.clone(),
            name: user.name.clone(),
            mail: user.mail.clone(),
            head: user.head.clone(),
            exp: Utc::now().timestamp() + ttl_secs,
        };
        self.sign(&claims)
    }

    /// Sign the logout/delete signal token: empty claims, already expired.
    pub fn issue_expired(&self) -> ApiResult<String> {
        let claims = Claims::empty(Utc::now().timestamp() + LOGOUT_TTL_SECS);
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims.
    ///
    /// Zero leeway: a token is rejected from its expiry instant onwards.
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
                _ => VerifyError::Malformed(e.to_string()),
            }),
        }
    }
}
