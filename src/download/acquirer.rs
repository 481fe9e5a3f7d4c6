//! Temp-file acquisition of Telegram-hosted media.
//!
//! The Bot API only hands out a file path; the bytes are fetched over plain
//! HTTP from `{base}/file/bot{token}/{path}`. A local Bot API server
//! (`BOT_API_URL`) lifts the 20 MB download limit of the public one.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::{MediaReference, ProgressSample};
use crate::upload::UploadError;

const PUBLIC_BOT_API: &str = "https://api.telegram.org";

/// Path prefix a local Bot API server reports for its own storage.
const LOCAL_SERVER_PREFIX: &str = "/var/lib/telegram-bot-api/";

/// Streams a media object to a local path.
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Writes the bytes of `media` to `dest` and returns the byte count.
    ///
    /// Samples go out with `try_send`: a full channel drops them. On error a
    /// partial file may remain; removing it is the caller's job.
    async fn acquire(
        &self,
        media: &MediaReference,
        dest: &Path,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<u64, UploadError>;
}

/// Acquirer backed by the Bot API file endpoint.
pub struct TelegramAcquirer {
    bot: Bot,
    base_url: Url,
    client: Client,
}

impl TelegramAcquirer {
    pub fn new(bot: Bot, bot_api_url: Option<&str>) -> AppResult<Self> {
        let base_url = Url::parse(bot_api_url.unwrap_or(PUBLIC_BOT_API))?;
        let client = Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self { bot, base_url, client })
    }
}

#[async_trait]
impl MediaAcquirer for TelegramAcquirer {
    async fn acquire(
        &self,
        media: &MediaReference,
        dest: &Path,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<u64, UploadError> {
        log::info!("📥 Starting download for file_id: {}", media.file_id);

        let file = self
            .bot
            .get_file(FileId(media.file_id.clone()))
            .await
            .map_err(|e| UploadError::Acquisition(format!("getFile failed: {}", e)))?;
        log::info!("✅ File info retrieved: path = {}, size = {} bytes", file.path, file.size);

        let file_url = build_file_url(&self.base_url, self.bot.token(), &file.path)
            .map_err(|e| UploadError::Acquisition(e.to_string()))?;

        let size_hint = media.file_size.or(Some(u64::from(file.size)).filter(|s| *s > 0));
        stream_to_file(&self.client, file_url, dest, size_hint, &progress).await
    }
}

/// Builds `{base}/file/bot{token}/{path}`, stripping a local server's storage prefix.
pub fn build_file_url(base: &Url, token: &str, file_path: &str) -> AppResult<Url> {
    let mut url = base.clone();
    let relative = file_path.strip_prefix(LOCAL_SERVER_PREFIX).unwrap_or(file_path);
    // A local server already puts the token directory first
    let relative = relative.strip_prefix(token).unwrap_or(relative);

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AppError::Config("BOT_API_URL cannot be a base URL".to_string()))?;
        segments.pop_if_empty();
        segments.push("file");
        segments.push(&format!("bot{token}"));
        for seg in relative.split('/').filter(|s| !s.is_empty()) {
            segments.push(seg);
        }
    }
    Ok(url)
}

/// GETs `url` into `dest`, emitting a sample per chunk.
///
/// `size_hint` wins over `Content-Length` for the total; both missing means
/// an unknown total (0).
pub async fn stream_to_file(
    client: &Client,
    url: Url,
    dest: &Path,
    size_hint: Option<u64>,
    progress: &mpsc::Sender<ProgressSample>,
) -> Result<u64, UploadError> {
    let started = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| UploadError::Acquisition(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UploadError::Acquisition(format!("HTTP {}", status)));
    }
    let total = size_hint.or(response.content_length()).unwrap_or(0);

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| UploadError::Acquisition(format!("cannot create {}: {}", dest.display(), e)))?;

    let mut transferred: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| UploadError::Acquisition(format!("error reading chunk: {}", e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| UploadError::Acquisition(format!("error writing to file: {}", e)))?;
        transferred += chunk.len() as u64;

        let _ = progress.try_send(ProgressSample {
            bytes_transferred: transferred,
            bytes_total: total,
            elapsed: started.elapsed(),
        });
    }
    file.flush()
        .await
        .map_err(|e| UploadError::Acquisition(format!("failed to flush file: {}", e)))?;

    log::info!(
        "✅ Download complete: {} ({:.2} MB)",
        dest.display(),
        transferred as f64 / (1024.0 * 1024.0)
    );
    Ok(transferred)
}
