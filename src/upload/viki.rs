//! VikingFile share.
//!
//! The response schema is loose: the link may sit under `url` or
//! `download`. When neither is present the upload still counts as done and
//! the raw response is handed back for the user to inspect.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;

use crate::core::config::VikiConfig;
use crate::upload::extract::{first_match, Extractor};
use crate::upload::{ensure_http_ok, file_part, http_client, read_json, BackendId, UploadBackend, UploadError, UploadResult};

const NAME: &str = "Viki";

const LINK: &[Extractor] = &[
    Extractor::Pointer("/url"),
    Extractor::Pointer("/download"),
    Extractor::Pointer("/links/url"),
];

pub struct VikiBackend {
    client: Client,
    config: VikiConfig,
}

impl VikiBackend {
    pub fn new(config: VikiConfig) -> Self {
        Self {
            client: http_client(None),
            config,
        }
    }

    async fn upload_server(&self) -> Result<String, UploadError> {
        let response = self.client.get(&self.config.server_url).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;
        first_match(&body, &[Extractor::Pointer("/server")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no server"))
    }

    fn parse_response(body: Value) -> UploadResult {
        match first_match(&body, LINK) {
            Some(url) => UploadResult::success(url),
            None => {
                log::warn!("Viki response carries no link, returning raw response");
                UploadResult::success(String::new()).with_extra("raw_response", body)
            }
        }
    }
}

#[async_trait]
impl UploadBackend for VikiBackend {
    fn id(&self) -> BackendId {
        BackendId::Viki
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        log::info!("⏫ Viki upload: {}", filename);
        let server = UploadError::map_step("get server", self.upload_server().await)?;

        let form = Form::new()
            .part("file", file_part(path, filename, None).await?)
            .text("user", self.config.user_hash.clone())
            .text("path", self.config.path.clone())
            .text("pathPublicShare", self.config.path_public_share.clone());

        let response = self.client.post(&server).multipart(form).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let result = Self::parse_response(body);
        log::info!("✅ Viki upload complete: {}", result.url().unwrap_or("<no link>"));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_then_download() {
        let result = VikiBackend::parse_response(json!({"url": "https://vikingfile.com/f/1"}));
        assert_eq!(result.url(), Some("https://vikingfile.com/f/1"));

        let result = VikiBackend::parse_response(json!({"download": "https://vikingfile.com/d/2"}));
        assert_eq!(result.url(), Some("https://vikingfile.com/d/2"));
    }

    #[test]
    fn test_no_link_is_still_success() {
        let body = json!({"hash": "zzz", "size": 10});
        let result = VikiBackend::parse_response(body.clone());
        assert!(result.is_success());
        assert_eq!(result.url(), Some(""));
        assert_eq!(result.extra("raw_response"), Some(&body));
    }
}
