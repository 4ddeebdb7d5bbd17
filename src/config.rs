//! Process configuration.
//!
//! Built once at startup from CLI/environment and passed by reference.
//! The signing secret is required: an absent or empty secret is a fatal
//! startup error, never something to sign with silently.

use std::path::PathBuf;

use anyhow::bail;

/// Configuration for one server process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind the HTTP listener to.
    pub bind: String,
    /// Path of the JSON store file.
    pub db_path: PathBuf,
    /// Token signing secret, process-wide for the process lifetime.
    pub secret: String,
    /// CORS origin allow-list.
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Validate and construct the configuration.
    pub fn new(
        bind: String,
        db_path: PathBuf,
        secret: String,
        allowed_origins: Vec<String>,
    ) -> anyhow::Result<Self> {
        if secret.trim().is_empty() {
            bail!("token signing secret must not be empty (set USERHUB_SECRET_KEY)");
        }
        Ok(Self {
            bind,
            db_path,
            secret,
            allowed_origins,
        })
    }
}
