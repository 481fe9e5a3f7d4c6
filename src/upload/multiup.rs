//! MultiUp, a multi-mirror host.
//!
//! Upload is a chain of five calls, each feeding the next:
//!
//! 1. `login` → user id
//! 2. `get-fastest-server` (by file size) → upload server
//! 3. `get-list-hosts` → mirrors, filtered by the configured allow-list
//! 4. `add-project` → project hash
//! 5. `{server}/upload/index.php` → per-mirror records
//!
//! The first failing step stops the chain and names itself in the reason.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::core::config::MultiupConfig;
use crate::core::utils::bytes_to_mb;
use crate::upload::extract::{error_message, first_match, Extractor};
use crate::upload::{ensure_http_ok, file_part, http_client, read_json, BackendId, UploadBackend, UploadError, UploadResult};

const NAME: &str = "MultiUp";

/// One mirror of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mirror {
    pub name: String,
    pub size: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Byte count as `"12.34 MB"`; missing or unparsable sizes count as 0.
fn mirror_size(record: &Value) -> String {
    let bytes = match record.get("size") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    format!("{:.2} MB", bytes_to_mb(bytes.max(0.0) as u64))
}

impl Mirror {
    fn from_value(record: &Value) -> Self {
        let field = |pointers: &[Extractor]| first_match(record, pointers).unwrap_or_default();
        Self {
            name: field(&[Extractor::Pointer("/name")]),
            size: mirror_size(record),
            kind: field(&[Extractor::Pointer("/type")]),
            url: field(&[
                Extractor::Pointer("/url"),
                Extractor::Pointer("/link"),
                Extractor::Pointer("/links/url"),
            ]),
        }
    }
}

pub struct MultiupBackend {
    client: Client,
    api_base: String,
    username: String,
    password: SecretString,
    project_name: String,
    project_password: String,
    project_description: String,
    file_description: String,
    allowed_hosts: Vec<String>,
}

impl MultiupBackend {
    pub fn new(config: MultiupConfig) -> Self {
        Self {
            client: http_client(None),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
            project_name: config.project_name,
            project_password: config.project_password,
            project_description: config.project_description,
            file_description: config.file_description,
            allowed_hosts: config.allowed_hosts,
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_base, name)
    }

    /// MultiUp reports errors as `{"error": "..."}`, with `"success"` meaning none.
    fn check_error_field(body: &Value) -> Result<(), UploadError> {
        match body.get("error").and_then(Value::as_str) {
            Some(e) if !e.is_empty() && !e.eq_ignore_ascii_case("success") => {
                Err(UploadError::protocol(NAME, e.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn post_form(&self, endpoint: &str, fields: &[(&str, &str)]) -> Result<Value, UploadError> {
        let response = self.client.post(self.endpoint(endpoint)).form(fields).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;
        Self::check_error_field(&body)?;
        Ok(body)
    }

    async fn login(&self) -> Result<String, UploadError> {
        if self.username.is_empty() {
            return Err(UploadError::protocol(NAME, "credentials not configured"));
        }
        let body = self
            .post_form(
                "login",
                &[
                    ("username", self.username.as_str()),
                    ("password", self.password.expose_secret()),
                ],
            )
            .await?;
        first_match(&body, &[Extractor::Pointer("/user")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no user id"))
    }

    async fn fastest_server(&self, size: u64) -> Result<String, UploadError> {
        let size = size.to_string();
        let body = self.post_form("get-fastest-server", &[("size", size.as_str())]).await?;
        first_match(&body, &[Extractor::Pointer("/server")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no server"))
    }

    async fn hosts(&self) -> Result<Vec<String>, UploadError> {
        let response = self.client.get(self.endpoint("get-list-hosts")).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;

        let hosts = parse_hosts(body.get("hosts").unwrap_or(&Value::Null))?;
        let allowed: Vec<String> = hosts
            .into_iter()
            .filter(|h| self.allowed_hosts.iter().any(|a| a == h))
            .collect();
        if allowed.is_empty() {
            return Err(UploadError::protocol(NAME, "no allowed hosts available"));
        }
        Ok(allowed)
    }

    async fn add_project(&self, user_id: &str) -> Result<String, UploadError> {
        let body = self
            .post_form(
                "add-project",
                &[
                    ("name", self.project_name.as_str()),
                    ("password", self.project_password.as_str()),
                    ("description", self.project_description.as_str()),
                    ("user-id", user_id),
                ],
            )
            .await?;
        first_match(&body, &[Extractor::Pointer("/hash")])
            .ok_or_else(|| UploadError::protocol(NAME, "response has no project hash"))
    }

    async fn send_file(
        &self,
        server: &str,
        path: &Path,
        filename: &str,
        user_id: &str,
        project_hash: &str,
        hosts: &[String],
    ) -> Result<Value, UploadError> {
        let mut form = Form::new()
            .part("files[]", file_part(path, filename, None).await?)
            .text("user", user_id.to_string())
            .text("project-hash", project_hash.to_string())
            .text("description", self.file_description.clone());
        for host in hosts {
            form = form.text(host.clone(), "true");
        }

        let url = format!("{}/upload/index.php", server.trim_end_matches('/'));
        let response = self.client.post(url).multipart(form).send().await?;
        let (status, body) = read_json(response).await?;
        ensure_http_ok(NAME, status, &body)?;
        Ok(body)
    }
}

/// Normalizes the four host list shapes MultiUp has been seen to return.
pub fn parse_hosts(raw: &Value) -> Result<Vec<String>, UploadError> {
    let hosts = match raw {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::String(s) => s
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("host").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => return Err(UploadError::protocol(NAME, "unrecognized hosts format")),
    };
    Ok(hosts)
}

/// Mirror records of an upload response.
pub fn parse_mirrors(body: &Value) -> Vec<Mirror> {
    let records: Vec<&Value> = match body {
        Value::Object(o) => match o.get("files") {
            Some(Value::Array(files)) => files.iter().collect(),
            _ => vec![body],
        },
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    };
    records.into_iter().map(Mirror::from_value).collect()
}

fn mirrors_result(body: &Value) -> Result<UploadResult, UploadError> {
    let mirrors = parse_mirrors(body);
    let primary = mirrors
        .iter()
        .find(|m| !m.url.is_empty())
        .map(|m| m.url.clone())
        .ok_or_else(|| UploadError::NoValidResult(format!("no mirror returned a URL: {}", error_message(body))))?;
    let list = serde_json::to_value(&mirrors).unwrap_or(Value::Null);
    Ok(UploadResult::success(primary).with_extra("mirrors", list))
}

#[async_trait]
impl UploadBackend for MultiupBackend {
    fn id(&self) -> BackendId {
        BackendId::Multiup
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        let user_id = UploadError::map_step("login", self.login().await)?;
        log::info!("🔑 MultiUp login ok (user {})", user_id);

        let size = tokio::fs::metadata(path).await?.len();
        let server = UploadError::map_step("get fastest server", self.fastest_server(size).await)?;
        let hosts = UploadError::map_step("get hosts", self.hosts().await)?;
        log::info!("MultiUp server {} with mirrors: {}", server, hosts.join(", "));

        let project_hash = UploadError::map_step("add project", self.add_project(&user_id).await)?;

        log::info!("⏫ MultiUp upload: {}", filename);
        let body = UploadError::map_step(
            "upload",
            self.send_file(&server, path, filename, &user_id, &project_hash, &hosts).await,
        )?;
        log::debug!("MultiUp upload response: {}", body);

        let result = mirrors_result(&body)?;
        log::info!("✅ MultiUp upload complete: {}", result.url().unwrap_or_default());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hosts_shapes() {
        let expected = vec!["gofile.io".to_string(), "vikingfile.com".to_string()];

        let mut from_object = parse_hosts(&json!({"gofile.io": 1, "vikingfile.com": 2})).unwrap();
        from_object.sort();
        assert_eq!(from_object, expected);
        assert_eq!(parse_hosts(&json!("gofile.io, vikingfile.com")).unwrap(), expected);
        assert_eq!(parse_hosts(&json!(["gofile.io", "vikingfile.com"])).unwrap(), expected);
        assert_eq!(
            parse_hosts(&json!([{"host": "gofile.io"}, {"host": "vikingfile.com"}])).unwrap(),
            expected
        );
        assert!(parse_hosts(&json!(42)).is_err());
    }

    #[test]
    fn test_mirrors_result_keeps_full_list() {
        let body = json!({"files": [
            {"name": "a.mp4", "size": 10485760, "type": "video/mp4", "url": ""},
            {"name": "a.mp4", "size": "1572864", "type": "video/mp4", "url": "https://multiup.io/x"}
        ]});
        let result = mirrors_result(&body).unwrap();
        assert_eq!(result.url(), Some("https://multiup.io/x"));
        let mirrors = result.extra("mirrors").and_then(Value::as_array).unwrap();
        assert_eq!(mirrors.len(), 2);
        assert_eq!(mirrors[0]["size"], json!("10.00 MB"));
        assert_eq!(mirrors[1]["size"], json!("1.50 MB"));
        assert_eq!(mirrors[1]["type"], json!("video/mp4"));
    }

    #[test]
    fn test_mirrors_result_without_urls() {
        let body = json!({"files": [{"name": "a.mp4", "size": 1, "type": "x", "url": ""}]});
        assert!(matches!(mirrors_result(&body), Err(UploadError::NoValidResult(_))));
        assert!(mirrors_result(&json!({"files": []})).is_err());
    }

    #[test]
    fn test_mirror_size_without_size_field() {
        assert_eq!(mirror_size(&json!({"name": "a"})), "0.00 MB");
        assert_eq!(mirror_size(&json!({"size": "n/a"})), "0.00 MB");
    }

    #[test]
    fn test_fallback_shapes() {
        let body = json!([{"name": "a", "link": "https://l"}]);
        assert_eq!(parse_mirrors(&body)[0].url, "https://l");

        let body = json!({"name": "a", "links": {"url": "https://nested"}});
        assert_eq!(parse_mirrors(&body)[0].url, "https://nested");
    }

    #[test]
    fn test_check_error_field() {
        assert!(MultiupBackend::check_error_field(&json!({"error": "success", "user": 1})).is_ok());
        assert!(MultiupBackend::check_error_field(&json!({"user": 1})).is_ok());
        let err = MultiupBackend::check_error_field(&json!({"error": "bad password"})).unwrap_err();
        assert_eq!(err.to_string(), "MultiUp error: bad password");
    }

    #[tokio::test]
    async fn test_empty_username_fails_login_before_network() {
        let backend = MultiupBackend::new(MultiupConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..MultiupConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, b"data").unwrap();

        let result = backend.upload(&path, "a.mp4").await;
        assert!(result.reason().unwrap().starts_with("login failed"));
    }
}
