//! # CMS Client Module
//!
//! Client `reqwest` per le due chiamate usate dalla pipeline:
//! - `POST {base}/api/assets/upload` (multipart, campo `files[]`, timeout 60s)
//! - `POST {base}/api/content/item/{collection}` (JSON `{"data": ...}`, timeout 30s)
//!
//! Entrambe autenticano con l'header `api-key`.

use crate::cms::asset::{normalize_upload_response, AssetRecord};
use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::file_manager::FileManager;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("cms-media-ingest/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "api-key";

/// Thin client over the CMS HTTP API
#[derive(Clone)]
pub struct CmsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
    upload_timeout: Duration,
    entry_timeout: Duration,
}

impl CmsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            upload_timeout: config.upload_timeout(),
            entry_timeout: config.entry_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one blob as an asset and return the record the CMS assigned
    pub async fn upload_asset(&self, bytes: &[u8], filename: &str) -> Result<AssetRecord> {
        let result = self.upload_asset_inner(bytes, filename).await;
        match &result {
            Ok(record) => info!(asset_id = %record.id_label(), filename, "Asset uploaded"),
            Err(e) => warn!(filename, "Upload error: {}", e),
        }
        result
    }

    async fn upload_asset_inner(&self, bytes: &[u8], filename: &str) -> Result<AssetRecord> {
        let url = format!("{}/api/assets/upload", self.base_url);
        let mime = FileManager::mime_for(filename);

        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = Form::new().part("files[]", part);

        debug!(url = %url, filename, mime, size = bytes.len(), "Uploading asset");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_token)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        let body = Self::check_status(response).await?.json::<Value>().await?;
        normalize_upload_response(body)
    }

    /// Create an item in `collection` with `data` as its fields
    pub async fn create_entry(&self, collection: &str, data: Value) -> Result<Value> {
        let result = self.create_entry_inner(collection, data).await;
        match &result {
            Ok(_) => info!(collection, "Collection entry created"),
            Err(e) => warn!(collection, "Entry creation error: {}", e),
        }
        result
    }

    async fn create_entry_inner(&self, collection: &str, data: Value) -> Result<Value> {
        let url = format!("{}/api/content/item/{}", self.base_url, collection);
        debug!(url = %url, "Creating collection entry");

        // .json() also sets Content-Type: application/json
        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_token)
            .json(&json!({ "data": data }))
            .timeout(self.entry_timeout)
            .send()
            .await?;

        let body = Self::check_status(response).await?.json::<Value>().await?;
        Ok(body)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IngestError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;

    #[test]
    fn test_client_creation_trims_base_url() {
        let config = Config {
            api_url: "https://cms.example.org/".to_string(),
            api_token: "tok".to_string(),
            upload_password: Credential::new("pw"),
            ..Default::default()
        };
        let client = CmsClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://cms.example.org");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = Config {
            // Port 9 (discard) on localhost is closed in practice
            api_url: "http://127.0.0.1:9".to_string(),
            api_token: "tok".to_string(),
            upload_password: Credential::new("pw"),
            upload_timeout_secs: 2,
            ..Default::default()
        };
        let client = CmsClient::new(&config).unwrap();
        let err = client.upload_asset(b"abc", "a.jpg").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }
}
