//! Mux direct uploads.
//!
//! Creates a direct-upload slot through the Video API (basic auth with the
//! access token), then PUTs the raw bytes to the returned URL. Mux hands out
//! no public link at this point: the result carries the upload id.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use crate::core::config::MuxConfig;
use crate::core::filetype::{extension, mime_for_filename};
use crate::upload::extract::{first_match, Extractor};
use crate::upload::{ensure_http_ok, http_client, read_json, BackendId, UploadBackend, UploadError, UploadResult};

const NAME: &str = "Mux";

/// Files smaller than this are assumed truncated.
pub const MIN_FILE_SIZE: u64 = 100;

/// Containers and codecs Mux ingests.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg", "ts", "mts", "m2ts", "vob", "asf",
    "divx", "f4v", "mxf", "qt", "xvid", "mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "opus", "aiff", "au", "amr",
    "ac3", "ape", "dts",
];

/// Containers that need the `smart` encoding tier to come out right.
const PROBLEMATIC_EXTENSIONS: &[&str] = &["avi", "wmv", "flv", "rm", "rmvb", "3gp"];

/// Upload slot lifetime requested from Mux.
const SLOT_TIMEOUT_SECS: u64 = 3600;

/// Encoding tier for a filename.
pub fn encoding_tier(filename: &str) -> &'static str {
    match extension(filename) {
        Some(ext) if PROBLEMATIC_EXTENSIONS.contains(&ext.as_str()) => "smart",
        _ => "baseline",
    }
}

/// Body of the upload-slot request.
pub fn create_upload_body(filename: &str) -> Value {
    json!({
        "new_asset_settings": {
            "playback_policy": ["public"],
            "encoding_tier": encoding_tier(filename),
            "normalize_audio": true,
            "master_access": "temporary",
            "mp4_support": "standard"
        },
        "cors_origin": "*",
        "timeout": SLOT_TIMEOUT_SECS
    })
}

/// Local checks run before the upload slot is requested.
pub fn verify_file(filename: &str, size: u64) -> Result<(), UploadError> {
    let ext = extension(filename).unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedFormat { backend: NAME, extension: ext });
    }
    if size == 0 {
        return Err(UploadError::InvalidFile("file is empty".to_string()));
    }
    if size < MIN_FILE_SIZE {
        return Err(UploadError::InvalidFile(format!(
            "file too small ({} bytes), likely corrupted",
            size
        )));
    }
    Ok(())
}

pub struct MuxBackend {
    client: Client,
    uploads_url: String,
    token_id: String,
    token_secret: SecretString,
    put_timeout: Duration,
}

impl MuxBackend {
    pub fn new(config: MuxConfig) -> Self {
        Self {
            client: http_client(None),
            uploads_url: config.uploads_url,
            token_id: config.token_id,
            token_secret: config.token_secret,
            put_timeout: config.put_timeout,
        }
    }

    /// Returns `(upload_url, upload_id)`.
    async fn create_upload(&self, filename: &str) -> Result<(String, String), UploadError> {
        let response = self
            .client
            .post(&self.uploads_url)
            .basic_auth(&self.token_id, Some(self.token_secret.expose_secret()))
            .json(&create_upload_body(filename))
            .send()
            .await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let url = first_match(&body, &[Extractor::Pointer("/data/url")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no upload url"))?;
        let id = first_match(&body, &[Extractor::Pointer("/data/id")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no upload id"))?;
        Ok((url, id))
    }

    async fn put_file(&self, upload_url: &str, path: &Path, filename: &str, size: u64) -> Result<(), UploadError> {
        let file = tokio::fs::File::open(path).await?;
        let response = self
            .client
            .put(upload_url)
            .timeout(self.put_timeout)
            .header(CONTENT_TYPE, mime_for_filename(filename))
            .header(CONTENT_LENGTH, size.to_string())
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = response.status().as_u16();
        if matches!(status, 200 | 201 | 204) {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(UploadError::protocol(NAME, format!("HTTP {}: {}", status, text.trim())))
    }
}

#[async_trait]
impl UploadBackend for MuxBackend {
    fn id(&self) -> BackendId {
        BackendId::Mux
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        let size = tokio::fs::metadata(path).await?.len();
        verify_file(filename, size)?;

        let tier = encoding_tier(filename);
        if tier == "smart" {
            log::warn!("⚠️ {} may have compatibility issues with Mux, using smart tier", filename);
        }

        let (upload_url, upload_id) = UploadError::map_step("create upload", self.create_upload(filename).await)?;
        log::info!("⏫ Mux upload {}: {} ({} bytes)", upload_id, filename, size);

        UploadError::map_step("upload", self.put_file(&upload_url, path, filename, size).await)?;
        log::info!("✅ Mux upload complete: {}", upload_id);

        Ok(UploadResult::success(upload_id.clone())
            .with_extra("upload_id", upload_id)
            .with_extra("encoding_tier", tier))
    }
}
