use axum::extract::{DefaultBodyLimit, State};
use axum::response::Response;
use axum::routing::{delete, post};
use axum::Router;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;

use plant_core::config::UploadConfig;
use plant_media::{MediaAsset, UploadRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::PathParam;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::upload::{request_limit, BufferedUpload};

pub const IMAGE_FIELD: &str = "image";
pub const DEFAULT_FOLDER: &str = "plants";

pub fn router(config: &UploadConfig) -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .route("/image/{*public_id}", delete(delete_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(request_limit(config)))
}

async fn upload_image(
    State(state): State<AppState>,
    upload: BufferedUpload,
) -> ApiResult<Response> {
    let file = upload
        .file(IMAGE_FIELD)
        .ok_or_else(|| ApiError::BadRequest("No image file provided".into()))?;

    let is_image = file
        .content_type
        .as_deref()
        .map_or(false, |ct| ct.starts_with("image/"));
    if !is_image {
        return Err(ApiError::BadRequest("Only image files are allowed".into()));
    }

    let request = UploadRequest {
        path: file.path.clone(),
        file_name: file.file_name.clone(),
        content_type: file.content_type.clone(),
        folder: Some(upload.field("folder").unwrap_or(DEFAULT_FOLDER).to_string()),
    };

    let asset: MediaAsset = state.media.upload(&request).await?;
    tracing::info!(
        host = state.media.name(),
        public_id = %asset.public_id,
        size = file.size,
        "Image uploaded"
    );

    Ok(ApiResponse::ok(asset)
        .with_message("Image uploaded successfully")
        .created())
}

async fn delete_image(
    State(state): State<AppState>,
    PathParam(public_id): PathParam<String>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    if !state.media.destroy(&public_id).await? {
        return Err(ApiError::NotFound(format!("Image not found: {public_id}")));
    }
    Ok(ApiResponse::ok(json!({ "publicId": public_id })).with_message("Image deleted successfully"))
}
