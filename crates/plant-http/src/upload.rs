//! Multipart buffering for the upload routes.
//!
//! File fields are streamed to the temporary directory before the handler
//! runs. A field larger than the configured limit aborts the request with 413
//! and the partial file is removed. Buffered files are deleted on drop.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use plant_core::config::UploadConfig;
use plant_core::error::{PlantError, PlantResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Room for multipart framing and text fields on top of the file limit.
pub const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Make sure the temporary directory is usable. Called once at startup.
pub fn prepare_temp_dir(config: &UploadConfig) -> PlantResult<()> {
    std::fs::create_dir_all(&config.temp_dir).map_err(|e| {
        PlantError::Upload(format!(
            "Cannot create temp dir {}: {e}",
            config.temp_dir.display()
        ))
    })?;
    tracing::debug!(
        temp_dir = %config.temp_dir.display(),
        max_file_size = config.max_file_size,
        "Upload buffering configured"
    );
    Ok(())
}

/// Whole-request cap used by the body-limit layer.
pub fn request_limit(config: &UploadConfig) -> usize {
    usize::try_from(config.max_file_size.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX)
}

#[derive(Debug)]
pub struct BufferedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub path: PathBuf,
    pub size: u64,
}

impl Drop for BufferedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temp upload");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BufferedUpload {
    pub files: Vec<BufferedFile>,
    pub fields: HashMap<String, String>,
}

impl BufferedUpload {
    pub fn file(&self, field_name: &str) -> Option<&BufferedFile> {
        self.files.iter().find(|f| f.field_name == field_name)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::Internal(err.body_text())
    }
}

impl FromRequest<AppState> for BufferedUpload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let limit = state.upload.max_file_size;
        let mut upload = BufferedUpload::default();

        while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
            let field_name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field.text().await.map_err(multipart_error)?;
                upload.fields.insert(field_name, text);
                continue;
            };

            let mut buffered = BufferedFile {
                field_name,
                file_name,
                content_type: field.content_type().map(str::to_string),
                path: state.upload.temp_dir.join(format!("upload-{}", Uuid::new_v4())),
                size: 0,
            };

            let mut out = tokio::fs::File::create(&buffered.path)
                .await
                .map_err(ApiError::internal)?;

            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                buffered.size += chunk.len() as u64;
                if buffered.size > limit {
                    tracing::warn!(
                        file_name = %buffered.file_name,
                        limit,
                        "Upload rejected: file too large"
                    );
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File exceeds the maximum size of {limit} bytes"
                    )));
                }
                out.write_all(&chunk).await.map_err(ApiError::internal)?;
            }
            out.flush().await.map_err(ApiError::internal)?;

            tracing::debug!(
                file_name = %buffered.file_name,
                size = buffered.size,
                "Upload buffered to disk"
            );
            upload.files.push(buffered);
        }

        Ok(upload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_buffered_file_removes_it() {
        let path = std::env::temp_dir().join(format!("upload-test-{}", Uuid::new_v4()));
        std::fs::write(&path, b"leaf").unwrap();

        let file = BufferedFile {
            field_name: "image".into(),
            file_name: "leaf.png".into(),
            content_type: Some("image/png".into()),
            path: path.clone(),
            size: 4,
        };
        drop(file);

        assert!(!path.exists());
    }

    #[test]
    fn request_limit_adds_framing_room() {
        let config = UploadConfig {
            max_file_size: 10,
            temp_dir: std::env::temp_dir(),
        };
        assert_eq!(request_limit(&config), 10 + 1024 * 1024);
    }

    #[test]
    fn temp_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("plant-uploads-{}", Uuid::new_v4()));
        let config = UploadConfig {
            max_file_size: 10,
            temp_dir: dir.clone(),
        };
        prepare_temp_dir(&config).unwrap();
        assert!(dir.is_dir());
        std::fs::remove_dir(&dir).unwrap();
    }
}
