//! Server assembly: open the store, wire the router, serve.

use std::sync::Arc;

use tracing::info;

use crate::api::{AppState, create_router};
use crate::auth::SessionManager;
use crate::config::AppConfig;
use crate::store::UserStore;

/// Run the HTTP server until the process is stopped.
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(UserStore::open(&config.db_path).await?);
    let sessions = Arc::new(SessionManager::new(&config.secret));

    let state = AppState { store, sessions };
    let app = create_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
