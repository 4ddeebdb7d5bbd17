//! userhub: a small token-authenticated user record API.
//!
//! Clients register an account, log in to receive a short-lived bearer
//! token, and use that token to read, update or delete their own record.
//! Records live in one JSON-file-backed store with account/mail
//! uniqueness enforced under a single write lock.

// Core modules
mod api;
mod auth;
mod config;
mod error;
mod store;
mod types;

pub mod server;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{
    BearerClaims, Claims, LOGOUT_TTL_SECS, SESSION_TTL_SECS, SessionManager, VerifyError,
    hash_password, require_self,
};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::serve;
pub use store::{NewUser, PublicUser, UserPatch, UserRecord, UserStore};
pub use types::{Account, UserId};
