//! Defines routes for the collection API and stored files.
//!
//! ## Structure
//! - **Auth**
//!   - `POST   /api/v1/auth/signin` — exchange the password for a token
//!
//! - **System**
//!   - `GET    /api/v1/system/info` — app name, version, and commit
//!
//! - **Collections** (writes require a password or bearer token)
//!   - `GET    /api/v1/collections` — paged list (`page`, `perPage`)
//!   - `POST   /api/v1/collections` — create
//!   - `GET    /api/v1/collections/{id}` — fetch one
//!   - `PATCH  /api/v1/collections/{id}` — edit title
//!   - `DELETE /api/v1/collections/{id}` — delete with all images
//!   - `GET    /api/v1/collections/{id}/images` — images in ingestion order
//!   - `POST   /api/v1/collections/{id}/upload` — multipart ZIP upload
//!   - `DELETE /api/v1/collections/{id}/images/{filename}` — delete one image
//!
//! - **Files**
//!   - `GET    /files/collections/{id}/images/{file}` — raw image bytes

use crate::{
    handlers::{
        auth_handlers::signin,
        collection_handlers::{
            create_collection, delete_collection, delete_collection_image, edit_collection,
            get_collection_by_id, get_collection_images, get_collections, upload_to_collection,
        },
        file_handlers::get_collection_image,
        health_handlers::{healthz, readyz},
        system_handlers::get_system_info,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build the router for every endpoint. Upload bodies may be up to
/// `max_upload_bytes`; other routes keep axum's default limit.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let api = Router::new()
        .route("/system/info", get(get_system_info))
        .route("/auth/signin", post(signin))
        .route(
            "/collections",
            get(get_collections).post(create_collection),
        )
        .route(
            "/collections/{id}",
            get(get_collection_by_id)
                .patch(edit_collection)
                .delete(delete_collection),
        )
        .route("/collections/{id}/images", get(get_collection_images))
        .route(
            "/collections/{id}/images/{filename}",
            delete(delete_collection_image),
        )
        .route(
            "/collections/{id}/upload",
            post(upload_to_collection).layer(DefaultBodyLimit::max(max_upload_bytes)),
        );

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/files/collections/{id}/images/{file}",
            get(get_collection_image),
        )
        .nest("/api/v1", api)
}
