// Image upload to the hosted asset service
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

use crate::config::UploadConfig;
use crate::error::{ClientError, ClientResult};

/// Inline `bytes` as a `data:` URI, typed by the file extension of `path`.
pub fn data_uri(path: &Path, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes))
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

pub struct ImageUploader {
    client: reqwest::Client,
    endpoint: Option<String>,
    preset: String,
}

impl ImageUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            preset: config.preset.clone(),
        }
    }

    /// Upload the image at `path` and return its public URL.
    pub async fn upload(&self, path: &Path) -> ClientResult<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ClientError::Validation("Image upload is not configured.".into()))?;

        let bytes = tokio::fs::read(path).await?;
        let form = [
            ("file", data_uri(path, &bytes)),
            ("upload_preset", self.preset.clone()),
        ];

        tracing::debug!(path = %path.display(), size = bytes.len(), "Uploading image");
        let response = self.client.post(endpoint).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, body));
        }

        let uploaded: UploadResponse = serde_json::from_slice(&response.bytes().await?)?;
        tracing::info!(url = %uploaded.secure_url, "Image uploaded");
        Ok(uploaded.secure_url)
    }
}
