//! MixDrop, a single-host locker for video files.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::Path;

use crate::core::config::MixdropConfig;
use crate::core::filetype::extension;
use crate::upload::extract::{error_message, first_match, Extractor};
use crate::upload::{
    ensure_http_ok, file_part, http_client, is_truthy, read_json, BackendId, UploadBackend, UploadError, UploadResult,
};

const NAME: &str = "MixDrop";

/// Containers MixDrop accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v"];

/// Link location, most specific first.
const LINK: &[Extractor] = &[
    Extractor::Pointer("/result/url"),
    Extractor::Pointer("/result/file"),
    Extractor::Stringified("/result"),
];

pub struct MixdropBackend {
    client: Client,
    api_url: String,
    email: String,
    key: SecretString,
}

impl MixdropBackend {
    pub fn new(config: MixdropConfig) -> Self {
        Self {
            client: http_client(Some(config.timeout)),
            api_url: config.api_url,
            email: config.email,
            key: config.key,
        }
    }

    /// Rejects anything outside the container whitelist.
    pub fn check_extension(filename: &str) -> Result<(), UploadError> {
        match extension(filename) {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            other => Err(UploadError::UnsupportedFormat {
                backend: NAME,
                extension: other.unwrap_or_default(),
            }),
        }
    }

    fn parse_response(body: &Value) -> Result<UploadResult, UploadError> {
        let has_result = body.get("result").is_some_and(|r| !r.is_null());
        if !is_truthy(body.get("success")) || !has_result {
            return Err(UploadError::protocol(NAME, format!("upload rejected: {}", error_message(body))));
        }
        let url = first_match(body, LINK).ok_or_else(|| UploadError::NoValidResult(body.to_string()))?;
        Ok(UploadResult::success(url))
    }
}

#[async_trait]
impl UploadBackend for MixdropBackend {
    fn id(&self) -> BackendId {
        BackendId::Mixdrop
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        Self::check_extension(filename)?;
        log::info!("⏫ MixDrop upload: {}", filename);

        let form = Form::new()
            .text("email", self.email.clone())
            .text("key", self.key.expose_secret().to_string())
            .part("file", file_part(path, filename, None).await?);

        let response = self.client.post(&self.api_url).multipart(form).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let result = Self::parse_response(&body)?;
        log::info!("✅ MixDrop upload complete: {}", result.url().unwrap_or_default());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_extension() {
        assert!(MixdropBackend::check_extension("movie.MKV").is_ok());
        assert!(MixdropBackend::check_extension("clip.avi").is_ok());

        let err = MixdropBackend::check_extension("notes.pdf").unwrap_err();
        assert!(err.to_string().contains("unsupported extension"));
        assert!(MixdropBackend::check_extension("noext").is_err());
    }

    #[test]
    fn test_parse_url_priority() {
        let body = json!({"success": true, "result": {"url": "https://mixdrop.ag/f/1", "file": "x"}});
        let result = MixdropBackend::parse_response(&body).unwrap();
        assert_eq!(result.url(), Some("https://mixdrop.ag/f/1"));

        let body = json!({"success": true, "result": {"fileref": "abc"}});
        let result = MixdropBackend::parse_response(&body).unwrap();
        assert_eq!(result.url(), Some(r#"{"fileref":"abc"}"#));
    }

    #[test]
    fn test_parse_requires_success_and_result() {
        let body = json!({"success": false, "result": {"url": "x"}});
        assert!(MixdropBackend::parse_response(&body).is_err());

        let body = json!({"success": true});
        assert!(MixdropBackend::parse_response(&body).is_err());
    }
}
