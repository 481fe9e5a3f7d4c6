//! GoFile, an anonymous object store.
//!
//! One multipart POST, no credentials. Success is the `status` field of the
//! body; the HTTP status alone is not enough. The direct link is built from
//! `data.id` and `data.name` and takes priority over the `downloadPage`
//! returned by the server.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;

use crate::core::config::GofileConfig;
use crate::core::filetype::mime_for_filename;
use crate::upload::extract::{first_match, Extractor};
use crate::upload::{ensure_http_ok, file_part, http_client, read_json, BackendId, UploadBackend, UploadError, UploadResult};

const NAME: &str = "GoFile";

pub struct GofileBackend {
    client: Client,
    config: GofileConfig,
}

impl GofileBackend {
    pub fn new(config: GofileConfig) -> Self {
        Self {
            client: http_client(None),
            config,
        }
    }

    /// Direct link `{download_base}/{id}/{name}`.
    fn download_url(&self, id: &str, name: &str) -> String {
        format!("{}/{}/{}", self.config.download_base.trim_end_matches('/'), id, name)
    }

    fn parse_response(&self, body: &Value) -> Result<UploadResult, UploadError> {
        if body.get("status").and_then(Value::as_str) != Some("ok") {
            return Err(UploadError::protocol(
                NAME,
                format!("status not ok: {}", crate::upload::extract::error_message(body)),
            ));
        }

        let id = first_match(body, &[Extractor::Pointer("/data/id"), Extractor::Pointer("/data/fileId")])
            .ok_or_else(|| UploadError::NoValidResult("response has no file id".to_string()))?;
        let name = first_match(body, &[Extractor::Pointer("/data/name"), Extractor::Pointer("/data/fileName")])
            .ok_or_else(|| UploadError::NoValidResult("response has no file name".to_string()))?;
        let page = first_match(body, &[Extractor::Pointer("/data/downloadPage")]).unwrap_or_default();

        let url = self.download_url(&id, &name);
        Ok(UploadResult::success(url.clone())
            .with_extra("download_url", url)
            .with_extra("download_page", page)
            .with_extra("id", id)
            .with_extra("name", name))
    }
}

#[async_trait]
impl UploadBackend for GofileBackend {
    fn id(&self) -> BackendId {
        BackendId::Gofile
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        log::info!("⏫ GoFile upload: {}", filename);

        let form = Form::new().part("file", file_part(path, filename, Some(mime_for_filename(filename))).await?);
        let response = self.client.post(&self.config.upload_url).multipart(form).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let result = self.parse_response(&body)?;
        log::info!("✅ GoFile upload complete: {}", result.url().unwrap_or_default());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> GofileBackend {
        GofileBackend::new(GofileConfig::default())
    }

    #[test]
    fn test_parse_ok_builds_direct_link() {
        let body = json!({
            "status": "ok",
            "data": {"id": "abc", "name": "f.mp4", "downloadPage": "https://gofile.io/d/abc"}
        });
        let result = backend().parse_response(&body).unwrap();
        assert_eq!(result.url(), Some("https://store2.gofile.io/download/web/abc/f.mp4"));
        assert_eq!(result.extra("download_page"), Some(&json!("https://gofile.io/d/abc")));
        assert_eq!(result.extra("id"), Some(&json!("abc")));
    }

    #[test]
    fn test_parse_status_not_ok() {
        let body = json!({"status": "error-rateLimit", "data": {}});
        let err = backend().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("status not ok"));
    }

    #[test]
    fn test_parse_missing_id() {
        let body = json!({"status": "ok", "data": {"name": "f.mp4"}});
        assert!(matches!(
            backend().parse_response(&body),
            Err(UploadError::NoValidResult(_))
        ));
    }

    #[test]
    fn test_download_base_trailing_slash() {
        let backend = GofileBackend::new(GofileConfig {
            upload_url: "http://localhost/uploadFile".to_string(),
            download_base: "http://localhost/dl/".to_string(),
        });
        assert_eq!(backend.download_url("x", "y.mkv"), "http://localhost/dl/x/y.mkv");
    }
}
