//! Shared application state handed to every handler.

use crate::services::{
    auth::AuthService, collection_repository::CollectionRepository,
    collection_service::CollectionService, ingest_service::IngestionService, layout::WorkDir,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info_span;

#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
    pub work_dir: WorkDir,
    pub collections: CollectionService,
    pub ingest: IngestionService,
    pub auth: AuthService,
}

impl AppState {
    /// Wire the services together. Each gets its own span to log under.
    pub fn new(db: Arc<SqlitePool>, work_dir: WorkDir, auth: AuthService) -> Self {
        let repo = CollectionRepository::new(db.clone(), info_span!("repository"));
        Self {
            collections: CollectionService::new(
                repo.clone(),
                work_dir.clone(),
                info_span!("collections"),
            ),
            ingest: IngestionService::new(repo, work_dir.clone(), info_span!("ingest")),
            db,
            work_dir,
            auth,
        }
    }
}
