//! Cloudinary-compatible unsigned uploads
//!
//! Files are posted as multipart form data to
//! `<api_base>/<cloud_name>/auto/upload` together with the unsigned upload
//! preset. The CDN picks the resource type itself.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{MediaError, MediaUpload, MediaUploader};
use crate::config::MediaConfig;

/// Uploader for a Cloudinary account
pub struct CloudinaryUploader {
    client: Client,
    endpoint: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    error: Option<UploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        if !config.is_configured() {
            return Err(MediaError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: upload_endpoint(&config.api_base, &config.cloud_name),
            upload_preset: config.upload_preset.clone(),
        })
    }
}

fn upload_endpoint(api_base: &str, cloud_name: &str) -> String {
    format!("{}/{}/auto/upload", api_base.trim_end_matches('/'), cloud_name)
}

/// Turn the CDN's JSON answer into a URL or its error message
fn interpret(status: reqwest::StatusCode, body: &str) -> Result<String, MediaError> {
    let parsed: Option<UploadResponse> = serde_json::from_str(body).ok();

    if let Some(message) = parsed.as_ref().and_then(|r| r.error.as_ref()).map(|e| e.message.clone()) {
        return Err(MediaError::Rejected(message));
    }
    if !status.is_success() {
        return Err(MediaError::Rejected(format!("upload failed with status {}", status.as_u16())));
    }

    parsed
        .and_then(|r| r.secure_url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| MediaError::Decode("response has no secure_url".to_string()))
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|e| MediaError::Rejected(format!("invalid content type: {e}")))?;

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let url = interpret(status, &body)?;
        tracing::info!("Uploaded media to {}", url);
        Ok(url)
    }
}
