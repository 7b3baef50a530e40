use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing::info_span;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use services::{auth::AuthService, layout::WorkDir};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting storebook with config: {:?}", cfg);

    // --- Ensure work directory layout exists ---
    let work_dir = WorkDir::new(&cfg.work_dir);
    work_dir
        .create()
        .await
        .with_context(|| format!("creating work directory {}", work_dir.path().display()))?;
    tracing::info!("Using work directory {}", work_dir.path().display());

    // --- Initialize SQLite connection ---
    let db_file = work_dir.database_file();
    tracing::debug!("Opening database {}", db_file.display());
    let db = Arc::new(db::connect(&db_file).await?);

    db::run_migrations(&db).await?;

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let auth = AuthService::new(cfg.password.clone(), &cfg.jwt_secret, info_span!("auth"));
    let state = AppState::new(db, work_dir, auth);

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes()).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
