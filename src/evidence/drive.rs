//! Google Drive artifact store

use crate::error::UploadError;
use crate::evidence::ArtifactStore;
use crate::google::TokenProvider;
use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    web_view_link: Option<String>,
}

/// Uploads screenshots into one Drive folder and shares them by link
pub struct DriveStore {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
    folder_id: String,
}

impl DriveStore {
    /// Store targeting `folder_id`
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenProvider>,
        base_url: &str,
        folder_id: &str,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            folder_id: folder_id.to_string(),
        }
    }

    async fn check(response: Response, step: &str) -> Result<Response, UploadError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UploadError::Store(format!(
            "{} failed with HTTP {}: {}",
            step,
            status.as_u16(),
            body
        )))
    }
}

fn transport(step: &str) -> impl Fn(reqwest::Error) -> UploadError + '_ {
    move |e| UploadError::Store(format!("{} request failed: {}", step, e))
}

#[async_trait]
impl ArtifactStore for DriveStore {
    async fn upload(&self, path: &Path, name: &str) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path).await?;
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.base_url))
            .bearer_auth(&token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(transport("upload"))?;
        let uploaded: UploadedFile = Self::check(response, "upload")
            .await?
            .json()
            .await
            .map_err(transport("upload"))?;
        debug!(file_id = %uploaded.id, "Uploaded artifact content");

        let response = self
            .http
            .patch(format!("{}/drive/v3/files/{}", self.base_url, uploaded.id))
            .bearer_auth(&token)
            // Media uploads land in the drive root; move rather than link
            .query(&[
                ("addParents", self.folder_id.as_str()),
                ("removeParents", "root"),
                ("fields", "webViewLink"),
            ])
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(transport("metadata"))?;
        let metadata: FileMetadata = Self::check(response, "metadata")
            .await?
            .json()
            .await
            .map_err(transport("metadata"))?;

        let response = self
            .http
            .post(format!(
                "{}/drive/v3/files/{}/permissions",
                self.base_url, uploaded.id
            ))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(transport("permission"))?;
        Self::check(response, "permission").await?;

        let link = metadata
            .web_view_link
            .ok_or_else(|| UploadError::Store("response has no webViewLink".to_string()))?;
        info!(file_id = %uploaded.id, name, "Evidence uploaded");
        Ok(link)
    }
}
