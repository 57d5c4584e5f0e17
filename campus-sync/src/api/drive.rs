//! Remote drive store client.
//!
//! The store itself does not enforce per-parent title uniqueness; the
//! provisioning task layers that on top. This client only maps the store's
//! REST surface onto typed calls.

use std::path::Path;

use async_trait::async_trait;

use super::models::RemoteItem;
use crate::config::DriveConfig;
use crate::error::Result;

/// Folder and file operations against the remote drive store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Child folders of `parent_id` with the given title.
    async fn find_folders_by_title(&self, title: &str, parent_id: &str) -> Result<Vec<RemoteItem>>;

    /// Create a folder under `parent_id`.
    async fn create_folder(&self, title: &str, parent_id: &str) -> Result<RemoteItem>;

    /// All folders under `parent_id`.
    async fn find_folders(&self, parent_id: &str) -> Result<Vec<RemoteItem>>;

    /// Child items (files or folders) of `parent_id` with the given title.
    async fn find_items_by_title(&self, title: &str, parent_id: &str) -> Result<Vec<RemoteItem>>;

    /// Upload a local file into `parent_id`.
    async fn upload_file(
        &self,
        title: &str,
        description: &str,
        parent_id: &str,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<RemoteItem>;

    /// Copy an existing item into another folder.
    async fn copy_item_to_folder(&self, item: &RemoteItem, parent_id: &str) -> Result<RemoteItem>;
}

/// HTTP implementation of [`RemoteStore`].
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    async fn list(&self, query: &str) -> Result<Vec<RemoteItem>> {
        let url = format!("{}/files?q={}", self.base_url, urlencoding::encode(query));
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

const FOLDER_MIME_TYPE: &str = "application/vnd.drive.folder";

#[async_trait]
impl RemoteStore for DriveClient {
    async fn find_folders_by_title(&self, title: &str, parent_id: &str) -> Result<Vec<RemoteItem>> {
        self.list(&format!(
            "mimeType='{}' and title='{}' and '{}' in parents",
            FOLDER_MIME_TYPE, title, parent_id
        ))
        .await
    }

    async fn create_folder(&self, title: &str, parent_id: &str) -> Result<RemoteItem> {
        let url = format!("{}/files", self.base_url);
        log::debug!("POST {} (folder '{}')", url, title);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "title": title,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn find_folders(&self, parent_id: &str) -> Result<Vec<RemoteItem>> {
        self.list(&format!(
            "mimeType='{}' and '{}' in parents",
            FOLDER_MIME_TYPE, parent_id
        ))
        .await
    }

    async fn find_items_by_title(&self, title: &str, parent_id: &str) -> Result<Vec<RemoteItem>> {
        self.list(&format!("title='{}' and '{}' in parents", title, parent_id))
            .await
    }

    async fn upload_file(
        &self,
        title: &str,
        description: &str,
        parent_id: &str,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<RemoteItem> {
        let url = format!("{}/files", self.base_url);
        log::debug!("POST {} (file '{}')", url, title);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "title": title,
                "description": description,
                "mimeType": mime_type,
                "parents": [parent_id],
            }))
            .send()
            .await?
            .error_for_status()?;
        let item: RemoteItem = response.json().await?;

        let content = tokio::fs::read(local_path).await?;
        let content_url = format!("{}/files/{}/content", self.base_url, item.id);
        log::debug!("PUT {} ({} bytes)", content_url, content.len());
        self.http
            .put(&content_url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(content)
            .send()
            .await?
            .error_for_status()?;
        Ok(item)
    }

    async fn copy_item_to_folder(&self, item: &RemoteItem, parent_id: &str) -> Result<RemoteItem> {
        let url = format!("{}/files/{}/copy", self.base_url, item.id);
        log::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "parents": [parent_id] }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
