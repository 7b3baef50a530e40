//! Direct serving of stored image files.

use crate::{errors::AppError, services::collection_service::CollectionError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Content type from a stored file's extension.
fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// `GET /files/collections/{id}/images/{file}` as a streaming response.
pub async fn get_collection_image(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let path = state.collections.image_path(&id, &filename)?;
    let file = File::open(&path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::from(CollectionError::ImageNotFound)
        } else {
            AppError::internal(err.to_string())
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .len();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}
