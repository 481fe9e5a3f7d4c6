//! Direct URL downloads for the `/link` command.
//!
//! Features:
//! - HEAD request for size estimation, oversize files rejected before GET
//! - Streaming GET with a hard byte cap
//! - Content-Disposition parsing for filename

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH};
use reqwest::Client;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

use crate::core::error::{AppError, AppResult};
use crate::core::filetype::{classify, FileCategory};
use crate::core::utils::{bytes_to_mb, BYTES_PER_MB};
use crate::download::ProgressSample;

/// Fallback when neither headers nor URL give a usable name.
pub const DEFAULT_FILENAME: &str = "downloaded_file";

/// A finished `/link` download.
#[derive(Debug, Clone)]
pub struct LinkDownload {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub category: FileCategory,
}

impl LinkDownload {
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size)
    }
}

/// Validates user input as an absolute http(s) URL.
pub fn parse_link(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::Validation(format!("invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::Validation(format!("unsupported URL: {}", raw.trim())));
    }
    Ok(url)
}

/// Filename from `Content-Disposition`, else the last URL segment if it has an extension.
pub fn filename_from(headers: &HeaderMap, url: &Url) -> String {
    if let Some(cd) = headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()) {
        // attachment; filename="file.mp3" or filename*=UTF-8''file.mp3
        if let Some(start) = cd.find("filename*=") {
            let value = cd[start + 10..].split(';').next().unwrap_or_default();
            let encoded = value.rsplit("''").next().unwrap_or(value).trim_matches('"');
            let decoded = urlencoding::decode(encoded).map(|s| s.into_owned()).unwrap_or_default();
            if !decoded.is_empty() {
                return decoded;
            }
        }
        if let Some(start) = cd.find("filename=") {
            let name = cd[start + 9..]
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"');
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
        .filter(|s| s.contains('.'))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// `Content-Length` header value. `Response::content_length` reports the
/// body size, which is always 0 for HEAD.
fn announced_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|len| *len > 0)
}

/// Downloads arbitrary URLs into job-private temp files.
pub struct LinkDownloader {
    client: Client,
    temp_dir: PathBuf,
    max_bytes: u64,
}

impl LinkDownloader {
    pub fn new(temp_dir: PathBuf, max_size_mb: u64) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; upmirror/0.3)")
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            temp_dir,
            max_bytes: max_size_mb.saturating_mul(BYTES_PER_MB as u64),
        })
    }

    fn too_large(&self, bytes: u64) -> AppError {
        AppError::Validation(format!(
            "File too large ({:.1}MB). Max allowed: {:.0}MB",
            bytes_to_mb(bytes),
            bytes_to_mb(self.max_bytes)
        ))
    }

    /// Downloads `url`. On error nothing is left on disk.
    pub async fn download(&self, url: &Url, progress: &mpsc::Sender<ProgressSample>) -> AppResult<LinkDownload> {
        log::info!("📥 Link download: {}", url);

        let head = self
            .client
            .head(url.as_str())
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if !head.status().is_success() {
            return Err(AppError::Download(format!("URL not accessible (Status {})", head.status())));
        }
        let announced = announced_length(head.headers());
        if let Some(len) = announced {
            if len > self.max_bytes {
                return Err(self.too_large(len));
            }
        }
        let filename = filename_from(head.headers(), url);

        let response = self.client.get(url.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }
        let total = announced.or(response.content_length()).unwrap_or(0);

        let path = self.temp_dir.join(format!("link_{}", Uuid::new_v4()));
        match self.write_capped(response, &path, total, progress).await {
            Ok(size) => {
                log::info!("✅ Link download complete: {} ({:.2} MB)", filename, bytes_to_mb(size));
                Ok(LinkDownload {
                    path,
                    category: classify(&filename),
                    filename,
                    size,
                })
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    log::debug!("Partial link download not removed: {}", rm);
                }
                Err(e)
            }
        }
    }

    async fn write_capped(
        &self,
        response: reqwest::Response,
        path: &PathBuf,
        total: u64,
        progress: &mpsc::Sender<ProgressSample>,
    ) -> AppResult<u64> {
        let started = Instant::now();
        let mut file = tokio::fs::File::create(path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            if downloaded > self.max_bytes {
                return Err(self.too_large(downloaded));
            }
            file.write_all(&chunk).await?;
            let _ = progress.try_send(ProgressSample {
                bytes_transferred: downloaded,
                bytes_total: total,
                elapsed: started.elapsed(),
            });
        }
        file.flush().await?;
        Ok(downloaded)
    }
}
