//! VOE video host.
//!
//! Two calls: ask for an upload server, then post the file to it. Both carry
//! the API key as a query parameter.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::Path;

use crate::core::config::VoeConfig;
use crate::core::filetype::{classify, extension, mime_for_filename, FileCategory};
use crate::upload::extract::{error_message, first_match, Extractor};
use crate::upload::{
    ensure_http_ok, file_part, http_client, is_truthy, read_json, BackendId, UploadBackend, UploadError, UploadResult,
};

const NAME: &str = "VOE";

pub struct VoeBackend {
    client: Client,
    server_url: String,
    api_key: SecretString,
    public_base: String,
}

impl VoeBackend {
    pub fn new(config: VoeConfig) -> Self {
        Self {
            client: http_client(Some(config.timeout)),
            server_url: config.server_url,
            api_key: config.api_key,
            public_base: config.public_base,
        }
    }

    /// VOE only takes videos.
    pub fn check_video(filename: &str) -> Result<(), UploadError> {
        if classify(filename) == FileCategory::Video {
            return Ok(());
        }
        Err(UploadError::UnsupportedFormat {
            backend: NAME,
            extension: extension(filename).unwrap_or_default(),
        })
    }

    async fn upload_server(&self) -> Result<String, UploadError> {
        let response = self
            .client
            .get(&self.server_url)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;
        if !is_truthy(body.get("success")) {
            return Err(UploadError::protocol(NAME, format!("server error: {}", error_message(&body))));
        }
        first_match(&body, &[Extractor::Pointer("/result")])
            .ok_or_else(|| UploadError::protocol(NAME, "server response has no upload url"))
    }

    fn parse_upload(&self, body: &Value) -> Result<UploadResult, UploadError> {
        if !is_truthy(body.get("success")) {
            return Err(UploadError::protocol(NAME, format!("upload error: {}", error_message(body))));
        }
        let code = first_match(body, &[Extractor::Pointer("/file/file_code")])
            .ok_or_else(|| UploadError::NoValidResult(body.to_string()))?;
        let url = format!("{}/{}", self.public_base.trim_end_matches('/'), code);
        Ok(UploadResult::success(url).with_extra("file_code", code))
    }
}

#[async_trait]
impl UploadBackend for VoeBackend {
    fn id(&self) -> BackendId {
        BackendId::Voe
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        Self::check_video(filename)?;
        log::info!("⏫ VOE upload: {}", filename);

        let upload_url = UploadError::map_step("get server", self.upload_server().await)?;
        log::debug!("VOE upload server: {}", upload_url);

        let form = Form::new().part("file", file_part(path, filename, Some(mime_for_filename(filename))).await?);
        let response = self
            .client
            .post(&upload_url)
            .query(&[("key", self.api_key.expose_secret())])
            .multipart(form)
            .send()
            .await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let result = self.parse_upload(&body)?;
        log::info!("✅ VOE upload complete: {}", result.url().unwrap_or_default());
        Ok(result)
    }
}
