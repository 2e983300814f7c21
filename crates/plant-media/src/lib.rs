use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use plant_core::error::PlantResult;

pub mod cloudinary;

pub use cloudinary::{cloudinary_connect, CloudinaryClient};

/// An image stored on the media host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub public_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A locally buffered file to push to the media host.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: Option<String>,
    pub folder: Option<String>,
}

/// Remote image storage.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> PlantResult<MediaAsset>;

    /// Returns false when the host did not know the asset.
    async fn destroy(&self, public_id: &str) -> PlantResult<bool>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
