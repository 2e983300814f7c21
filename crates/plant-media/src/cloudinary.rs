use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use plant_core::config::{MediaConfig, Secret};
use plant_core::error::{PlantError, PlantResult};

use crate::{MediaAsset, MediaHost, UploadRequest};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Cloudinary image API client using signed requests.
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: Secret,
    base_url: String,
}

impl CloudinaryClient {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.base_url, self.cloud_name)
    }

    /// Signed parameter set plus `api_key` and `signature`.
    fn signed_params(&self, mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
        params.insert("timestamp".into(), unix_timestamp().to_string());
        let signature = sign(&params, self.api_secret.expose());
        params.insert("api_key".into(), self.api_key.clone());
        params.insert("signature".into(), signature);
        params
    }
}

/// Build and announce the media-host client.
pub fn cloudinary_connect(config: &MediaConfig) -> CloudinaryClient {
    let client = CloudinaryClient::new(config);
    tracing::info!(cloud_name = %client.cloud_name(), "Cloudinary client configured");
    client
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// SHA-1 over `k=v&k=v` (keys sorted, empty values skipped) followed by the secret.
pub fn sign(params: &BTreeMap<String, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(k, v)| {
            !v.is_empty() && !matches!(k.as_str(), "file" | "api_key" | "resource_type" | "cloud_name")
        })
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

impl From<UploadResponse> for MediaAsset {
    fn from(resp: UploadResponse) -> Self {
        MediaAsset {
            public_id: resp.public_id,
            url: resp.secure_url,
            format: resp.format,
            bytes: resp.bytes,
            width: resp.width,
            height: resp.height,
        }
    }
}

fn error_message(body: &serde_json::Value) -> String {
    body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn parse_upload_response(
    status: reqwest::StatusCode,
    body: serde_json::Value,
) -> PlantResult<MediaAsset> {
    if !status.is_success() {
        return Err(PlantError::MediaHost(format!(
            "Cloudinary upload failed ({status}): {}",
            error_message(&body)
        )));
    }
    let resp: UploadResponse = serde_json::from_value(body)
        .map_err(|e| PlantError::MediaHost(format!("Unexpected Cloudinary response: {e}")))?;
    Ok(resp.into())
}

fn parse_destroy_response(status: reqwest::StatusCode, body: &serde_json::Value) -> PlantResult<bool> {
    if !status.is_success() {
        return Err(PlantError::MediaHost(format!(
            "Cloudinary destroy failed ({status}): {}",
            error_message(body)
        )));
    }
    match body["result"].as_str() {
        Some("ok") => Ok(true),
        Some("not found") => Ok(false),
        other => Err(PlantError::MediaHost(format!(
            "Unexpected Cloudinary destroy result: {other:?}"
        ))),
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, request: &UploadRequest) -> PlantResult<MediaAsset> {
        let bytes = tokio::fs::read(&request.path).await.map_err(|e| {
            PlantError::Upload(format!("Cannot read {}: {e}", request.path.display()))
        })?;
        let size = bytes.len();

        let mut params = BTreeMap::new();
        if let Some(ref folder) = request.folder {
            params.insert("folder".to_string(), folder.clone());
        }
        let params = self.signed_params(params);

        let mut part = Part::bytes(bytes).file_name(request.file_name.clone());
        if let Some(ref content_type) = request.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| PlantError::Upload(format!("Invalid content type: {e}")))?;
        }

        let form = params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        let resp = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlantError::MediaHost(format!("Cloudinary request failed: {e}")))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PlantError::MediaHost(format!("Invalid Cloudinary response: {e}")))?;

        let asset = parse_upload_response(status, body)?;
        tracing::info!(
            public_id = %asset.public_id,
            bytes = size,
            "Image uploaded to Cloudinary"
        );
        Ok(asset)
    }

    async fn destroy(&self, public_id: &str) -> PlantResult<bool> {
        let mut params = BTreeMap::new();
        params.insert("public_id".to_string(), public_id.to_string());
        let params = self.signed_params(params);

        let resp = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| PlantError::MediaHost(format!("Cloudinary request failed: {e}")))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PlantError::MediaHost(format!("Invalid Cloudinary response: {e}")))?;

        let removed = parse_destroy_response(status, &body)?;
        tracing::info!(%public_id, removed, "Cloudinary destroy completed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn config() -> MediaConfig {
        MediaConfig {
            cloud_name: "demo".into(),
            api_key: "1234".into(),
            api_secret: Secret::new("abcd"),
        }
    }

    #[test]
    fn signature_matches_documented_example() {
        // Worked example from the Cloudinary signing documentation.
        let mut params = BTreeMap::new();
        params.insert("timestamp".to_string(), "1315060510".to_string());
        params.insert("public_id".to_string(), "sample_image".to_string());
        params.insert("eager".to_string(), "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());

        assert_eq!(sign(&params, "abcd"), "bfd09f95f331f558cbd1320e67aa8d488770583e");
    }

    #[test]
    fn signature_ignores_unsigned_keys() {
        let mut base = BTreeMap::new();
        base.insert("timestamp".to_string(), "1".to_string());
        let mut extended = base.clone();
        extended.insert("api_key".to_string(), "1234".to_string());
        extended.insert("file".to_string(), "data".to_string());
        extended.insert("folder".to_string(), String::new());

        assert_eq!(sign(&base, "s"), sign(&extended, "s"));
    }

    #[test]
    fn signed_params_carry_key_and_signature() {
        let client = CloudinaryClient::new(&config());
        let params = client.signed_params(BTreeMap::new());

        assert_eq!(params.get("api_key").map(String::as_str), Some("1234"));
        assert_eq!(params.get("signature").map(String::len), Some(40));
        assert!(params.contains_key("timestamp"));
    }

    #[test]
    fn endpoint_uses_cloud_name() {
        let client = CloudinaryClient::new(&config()).with_base_url("http://localhost:9000/");
        assert_eq!(client.endpoint("upload"), "http://localhost:9000/demo/image/upload");
    }

    #[test]
    fn upload_response_maps_to_asset() {
        let body = serde_json::json!({
            "public_id": "plants/monstera",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/plants/monstera.jpg",
            "format": "jpg",
            "bytes": 2048,
            "width": 640,
            "height": 480,
        });
        let asset = parse_upload_response(StatusCode::OK, body).unwrap();

        assert_eq!(asset.public_id, "plants/monstera");
        assert_eq!(asset.width, Some(640));
    }

    #[test]
    fn upload_error_carries_host_message() {
        let body = serde_json::json!({ "error": { "message": "Invalid Signature" } });
        let err = parse_upload_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(err.to_string().contains("Invalid Signature"));
    }

    #[test]
    fn destroy_result_is_interpreted() {
        let ok = serde_json::json!({ "result": "ok" });
        let missing = serde_json::json!({ "result": "not found" });
        assert!(parse_destroy_response(StatusCode::OK, &ok).unwrap());
        assert!(!parse_destroy_response(StatusCode::OK, &missing).unwrap());
    }
}
