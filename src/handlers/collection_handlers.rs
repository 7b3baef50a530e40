//! HTTP handlers for collections, their images, and archive uploads.
//! Storage and consistency rules live in the services; these handlers only
//! translate between JSON / multipart and service calls.

use crate::{
    errors::AppError,
    handlers::auth_handlers::RequireAuth,
    models::{collection::Collection as DbCollection, image::Image, page::FetchOptions, page::Page},
    services::ingest_service::{IngestReport, UploadedFile},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 100;
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

impl From<DbCollection> for Collection {
    fn from(collection: DbCollection) -> Self {
        Self {
            id: collection.id,
            title: collection.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetCollections {
    pub page: Page,
    pub collections: Vec<Collection>,
}

#[derive(Debug, Serialize)]
pub struct CreateCollection {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionImage {
    pub collection_id: String,
    pub hash: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct GetCollectionImages {
    pub images: Vec<CollectionImage>,
}

/// `?page=&perPage=`. Unparseable values fall back to the defaults.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    #[serde(rename = "perPage")]
    pub per_page: Option<String>,
}

impl PageQuery {
    pub fn fetch_options(&self) -> FetchOptions {
        let per_page = self
            .per_page
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PER_PAGE);
        let page = self
            .page
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0)
            .max(0);
        FetchOptions { page, per_page }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionBody {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct EditCollectionBody {
    pub title: Option<String>,
}

/// `scheme://host` of the incoming request, honouring `X-Forwarded-Proto`.
fn request_origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

fn convert_image(origin: &str, image: Image) -> CollectionImage {
    let url = format!(
        "{}/files/collections/{}/images/{}",
        origin, image.collection_id, image.filename
    );
    CollectionImage {
        collection_id: image.collection_id,
        hash: image.hash,
        filename: image.filename,
        url,
    }
}

/// `GET /api/v1/collections`
pub async fn get_collections(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<GetCollections>, AppError> {
    let (collections, page) = state.collections.list(q.fetch_options()).await?;
    Ok(Json(GetCollections {
        page,
        collections: collections.into_iter().map(Collection::from).collect(),
    }))
}

/// `GET /api/v1/collections/{id}`
pub async fn get_collection_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Collection>, AppError> {
    let collection = state.collections.get(&id).await?;
    Ok(Json(collection.into()))
}

/// `GET /api/v1/collections/{id}/images`, in ingestion order.
pub async fn get_collection_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<GetCollectionImages>, AppError> {
    let origin = request_origin(&headers);
    let images = state.collections.images(&id).await?;
    Ok(Json(GetCollectionImages {
        images: images
            .into_iter()
            .map(|image| convert_image(&origin, image))
            .collect(),
    }))
}

/// `POST /api/v1/collections`
pub async fn create_collection(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Json(body): Json<CreateCollectionBody>,
) -> Result<Json<CreateCollection>, AppError> {
    let collection = state.collections.create(&body.title).await?;
    Ok(Json(CreateCollection { id: collection.id }))
}

/// `PATCH /api/v1/collections/{id}`
pub async fn edit_collection(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<EditCollectionBody>,
) -> Result<StatusCode, AppError> {
    state.collections.edit(&id, body.title.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/collections/{id}`
pub async fn delete_collection(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.collections.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/collections/{id}/images/{filename}`
pub async fn delete_collection_image(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path((id, filename)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.collections.delete_image(&id, &filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/collections/{id}/upload`
///
/// Multipart body with one or more `file` parts. Parts declared as
/// `application/zip` are ingested in the order received; others are skipped.
pub async fn upload_to_collection(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, AppError> {
    let collection = state.collections.get(&id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(err.status(), err.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::new(err.status(), err.body_text()))?;

        files.push(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::bad_request(format!(
            "expected at least one `{}` field",
            UPLOAD_FIELD
        )));
    }

    let report = state.ingest.ingest_files(&collection.id, files).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, per_page: Option<&str>) -> FetchOptions {
        PageQuery {
            page: page.map(str::to_string),
            per_page: per_page.map(str::to_string),
        }
        .fetch_options()
    }

    #[test]
    fn page_query_defaults_and_fallbacks() {
        let opts = query(None, None);
        assert_eq!((opts.page, opts.per_page), (0, DEFAULT_PER_PAGE));

        let opts = query(Some("2"), Some("25"));
        assert_eq!((opts.page, opts.per_page), (2, 25));

        let opts = query(Some("abc"), Some("0"));
        assert_eq!((opts.page, opts.per_page), (0, DEFAULT_PER_PAGE));
    }

    #[test]
    fn origin_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "books.example".parse().unwrap());
        assert_eq!(request_origin(&headers), "http://books.example");

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(request_origin(&headers), "https://books.example");
    }
}
