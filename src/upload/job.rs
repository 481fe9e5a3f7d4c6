//! Upload jobs: callback parsing, the job state machine and result text.
//!
//! A job goes `Idle → Downloading → Uploading → Done`. Whatever happens in
//! between, the temp file is gone once the job reaches `Done`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::filetype::sanitize_filename;
use crate::core::utils::{bytes_to_mb, truncate_chars};
use crate::download::progress::{self, push, spawn_reporter, ProgressReporter, StatusSink};
use crate::download::{MediaAcquirer, MediaReference};
use crate::upload::registry::BackendRegistry;
use crate::upload::{BackendId, UploadError, UploadResult};

/// Prefix of upload menu callback data.
pub const CALLBACK_PREFIX: &str = "up";

/// Reply to the `all` button.
pub const ALL_NOT_AVAILABLE: &str =
    "⚠️ Uploading to all services at once is not available yet. Please pick a single service.";

/// Telegram rejects longer messages.
const MAX_MESSAGE_CHARS: usize = 4000;

/// What an upload menu button asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    One(BackendId),
    All,
}

impl BackendChoice {
    fn as_str(&self) -> &str {
        match self {
            BackendChoice::One(id) => id.as_ref(),
            BackendChoice::All => "all",
        }
    }
}

/// Parsed `up:<backend>:<message_id>` callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRequest {
    pub choice: BackendChoice,
    /// Message holding the media
    pub message_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid callback data")]
pub struct InvalidCallbackData;

/// Builds the callback data of a menu button.
pub fn callback_data(choice: BackendChoice, message_id: i32) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, choice.as_str(), message_id)
}

/// Parses callback data. Only the menu backends and `all` are accepted.
///
/// ```
/// use upmirror::upload::job::{parse_callback_data, BackendChoice};
/// use upmirror::upload::BackendId;
///
/// let req = parse_callback_data("up:gofile:42").unwrap();
/// assert_eq!(req.choice, BackendChoice::One(BackendId::Gofile));
/// assert_eq!(req.message_id, 42);
/// assert!(parse_callback_data("up:gofile").is_err());
/// ```
pub fn parse_callback_data(data: &str) -> Result<UploadRequest, InvalidCallbackData> {
    let parts: Vec<&str> = data.split(':').collect();
    let [prefix, backend, message_id] = parts.as_slice() else {
        return Err(InvalidCallbackData);
    };
    if *prefix != CALLBACK_PREFIX {
        return Err(InvalidCallbackData);
    }

    let choice = if *backend == "all" {
        BackendChoice::All
    } else {
        let id = BackendId::from_str(backend).map_err(|_| InvalidCallbackData)?;
        if !BackendId::MENU.contains(&id) {
            return Err(InvalidCallbackData);
        }
        BackendChoice::One(id)
    };
    let message_id = message_id.parse::<i32>().map_err(|_| InvalidCallbackData)?;

    Ok(UploadRequest { choice, message_id })
}

/// Checks that the media found behind the menu is the one the button names.
pub fn check_reference(found: Option<MediaReference>, expected_message_id: i32) -> Result<MediaReference, UploadError> {
    match found {
        Some(media) if media.message_id == expected_message_id => Ok(media),
        _ => Err(UploadError::ReferenceNotFound),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Downloading,
    Uploading,
    Done(UploadResult),
}

/// One media object going to one backend.
#[derive(Debug)]
pub struct UploadJob {
    pub id: Uuid,
    pub backend: BackendId,
    pub source: MediaReference,
    /// Name announced to the backend
    pub filename: String,
    /// `<temp_dir>/<job id>_<sanitized filename>`
    pub local_path: PathBuf,
    state: JobState,
}

impl UploadJob {
    pub fn new(backend: BackendId, source: MediaReference, temp_dir: &Path) -> Self {
        let id = Uuid::new_v4();
        let filename = source.display_name();
        let local_path = temp_dir.join(format!("{}_{}", id, sanitize_filename(&filename)));
        Self {
            id,
            backend,
            source,
            filename,
            local_path,
            state: JobState::Idle,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    fn transition(&mut self, next: JobState) {
        log::debug!("Job {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Removes the temp file when dropped, unless already removed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    async fn remove(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => log::debug!("🗑️ Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temp file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::warn!("Failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Drives upload jobs from download to result text.
#[derive(Clone)]
pub struct Coordinator {
    acquirer: Arc<dyn MediaAcquirer>,
    registry: BackendRegistry,
}

impl Coordinator {
    pub fn new(acquirer: Arc<dyn MediaAcquirer>, registry: BackendRegistry) -> Self {
        Self { acquirer, registry }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Runs `job` to completion, reporting on `status`.
    ///
    /// Never fails: every error ends as an `UploadResult::Failure` and as the
    /// final status text.
    pub async fn run(&self, job: &mut UploadJob, status: Arc<dyn StatusSink>) -> UploadResult {
        let guard = TempFileGuard::new(job.local_path.clone());
        let (result, size) = self.execute(job, &status).await;
        guard.remove().await;

        let text = format_result(job.backend, &job.filename, size, &result);
        if let Err(e) = status.update(&text).await {
            log::warn!("Failed to post result of job {}: {}", job.id, e);
        }
        job.transition(JobState::Done(result.clone()));
        result
    }

    async fn execute(&self, job: &mut UploadJob, status: &Arc<dyn StatusSink>) -> (UploadResult, u64) {
        let announced = job.source.file_size.unwrap_or(0);
        let Some(backend) = self.registry.get(job.backend) else {
            return (UploadResult::failure("backend not configured"), announced);
        };

        job.transition(JobState::Downloading);
        push(
            status.as_ref(),
            &format!(
                "📥 Downloading media...\n📁 Filename: {}\n📊 Size: {:.1} MB",
                job.filename,
                bytes_to_mb(announced)
            ),
        )
        .await;

        let (tx, rx) = progress::channel();
        let reporter = spawn_reporter(ProgressReporter::new("Downloading", job.filename.clone()), rx, status.clone());
        let acquired = self.acquirer.acquire(&job.source, &job.local_path, tx).await;
        // The sender is gone; wait for the last status edit before moving on
        if let Err(e) = reporter.await {
            log::warn!("Progress reporter of job {} crashed: {}", job.id, e);
        }

        let size = match acquired {
            Ok(size) => size,
            Err(e) => {
                log::error!("❌ Job {}: {}", job.id, e);
                return (UploadResult::from(e), announced);
            }
        };

        job.transition(JobState::Uploading);
        push(
            status.as_ref(),
            &format!(
                "⏫ Uploading to {}...\n📁 Filename: {}\n📊 Size: {:.1} MB",
                backend.display_name(),
                job.filename,
                bytes_to_mb(size)
            ),
        )
        .await;

        let result = backend.upload(&job.local_path, &job.filename).await;
        (result, size)
    }
}

/// User-visible text for a finished job.
pub fn format_result(backend: BackendId, filename: &str, size: u64, result: &UploadResult) -> String {
    let name = backend.display_name();
    let size_mb = bytes_to_mb(size);

    let text = match result {
        UploadResult::Failure { reason } => format!("❌ {} upload failed: {}", name, reason),
        UploadResult::Success { url, extra } => match backend {
            BackendId::Multiup => {
                let mut text = format!(
                    "✅ Uploaded to MultiUp successfully!\n\n📁 Original file: {}\n📊 Size: {:.1} MB\n\nUpload Results:\n{}\n",
                    filename,
                    size_mb,
                    "─".repeat(30)
                );
                let mirrors = extra.get("mirrors").and_then(|m| m.as_array()).cloned().unwrap_or_default();
                for mirror in mirrors.iter().filter(|m| m["url"].as_str().is_some_and(|u| !u.is_empty())) {
                    let field = |key: &str| mirror[key].as_str().unwrap_or_default().to_string();
                    let _ = write!(
                        text,
                        "\n📁 {}\n Size: {}\n📝 Type: {}\n🔗 URL: {}\n",
                        field("name"),
                        field("size"),
                        field("type"),
                        field("url")
                    );
                }
                text
            }
            BackendId::Gofile => {
                let page = extra.get("download_page").and_then(|p| p.as_str()).unwrap_or_default();
                format!(
                    "✅ Uploaded successfully!\n📁 Filename: {}\n📊 Size: {:.1} MB\n\n🔗 Download: {}\nℹ️ GoFile Link: {}",
                    filename, size_mb, url, page
                )
            }
            BackendId::Mux => format!(
                "✅ Uploaded to Mux!\n📁 Filename: {}\n📊 Size: {:.1} MB\n🆔 Upload ID: {}\nProcessing will begin shortly.",
                filename, size_mb, url
            ),
            _ if url.is_empty() => {
                let raw = extra.get("raw_response").map(|r| r.to_string()).unwrap_or_default();
                format!("✅ Uploaded to {} successfully! Response:\n{}", name, raw)
            }
            _ => format!(
                "✅ Uploaded to {} successfully!\n📁 Filename: {}\n📊 Size: {:.1} MB\n🔗 Download URL: {}",
                name, filename, size_mb, url
            ),
        },
    };
    truncate_chars(&text, MAX_MESSAGE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::MediaKind;
    use serde_json::json;

    fn media(message_id: i32, name: Option<&str>) -> MediaReference {
        MediaReference {
            chat_id: 7,
            message_id,
            file_id: "BAAC".to_string(),
            file_name: name.map(str::to_string),
            file_size: Some(2048),
            mime_type: None,
            kind: MediaKind::Video,
        }
    }

    #[test]
    fn test_parse_callback_data_valid() {
        let req = parse_callback_data("up:multiup:123").unwrap();
        assert_eq!(req.choice, BackendChoice::One(BackendId::Multiup));
        assert_eq!(req.message_id, 123);

        let req = parse_callback_data("up:all:5").unwrap();
        assert_eq!(req.choice, BackendChoice::All);
    }

    #[test]
    fn test_parse_callback_data_invalid() {
        for data in [
            "",
            "up:gofile",
            "up:gofile:1:2",
            "down:gofile:1",
            "up:dropbox:1",
            "up:mux:1",
            "up:gofile:abc",
            "up:gofile:",
        ] {
            assert_eq!(parse_callback_data(data), Err(InvalidCallbackData), "{:?}", data);
        }
        assert_eq!(InvalidCallbackData.to_string(), "Invalid callback data");
    }

    #[test]
    fn test_callback_data_roundtrip() {
        for id in BackendId::MENU {
            let data = callback_data(BackendChoice::One(id), 99);
            assert_eq!(parse_callback_data(&data).unwrap().choice, BackendChoice::One(id));
        }
        assert_eq!(callback_data(BackendChoice::All, 3), "up:all:3");
    }

    #[test]
    fn test_check_reference() {
        assert!(check_reference(Some(media(5, None)), 5).is_ok());
        assert!(matches!(
            check_reference(Some(media(5, None)), 6),
            Err(UploadError::ReferenceNotFound)
        ));
        assert!(matches!(check_reference(None, 6), Err(UploadError::ReferenceNotFound)));
    }

    #[test]
    fn test_job_paths_are_unique_and_sanitized() {
        let dir = Path::new("/tmp/jobs");
        let a = UploadJob::new(BackendId::Gofile, media(1, Some("my:clip.mkv")), dir);
        let b = UploadJob::new(BackendId::Gofile, media(1, Some("my:clip.mkv")), dir);
        assert_ne!(a.local_path, b.local_path);
        assert!(a.local_path.starts_with(dir));
        assert!(a.local_path.to_string_lossy().ends_with("_myclip.mkv"));
        assert_eq!(a.filename, "my:clip.mkv");
        assert_eq!(a.state(), &JobState::Idle);
    }

    #[test]
    fn test_format_failure() {
        let text = format_result(BackendId::Voe, "a.mp4", 0, &UploadResult::failure("boom"));
        assert_eq!(text, "❌ VOE upload failed: boom");
    }

    #[test]
    fn test_format_gofile_shows_both_links() {
        let result = UploadResult::success("https://store2.gofile.io/download/web/abc/f.mp4")
            .with_extra("download_page", "https://gofile.io/d/abc");
        let text = format_result(BackendId::Gofile, "f.mp4", 1024 * 1024, &result);
        assert!(text.contains("🔗 Download: https://store2.gofile.io/download/web/abc/f.mp4"));
        assert!(text.contains("GoFile Link: https://gofile.io/d/abc"));
        assert!(text.contains("1.0 MB"));
    }

    #[test]
    fn test_format_multiup_lists_mirrors() {
        let result = UploadResult::success("https://m/1").with_extra(
            "mirrors",
            json!([
                {"name": "f.mp4", "size": "10.00 MB", "type": "video/mp4", "url": "https://m/1"},
                {"name": "f.mp4", "size": "10.00 MB", "type": "video/mp4", "url": ""}
            ]),
        );
        let text = format_result(BackendId::Multiup, "f.mp4", 10, &result);
        assert_eq!(text.matches("🔗 URL:").count(), 1);
        assert!(text.contains("📝 Type: video/mp4"));
        assert!(text.contains(" Size: 10.00 MB"));
    }

    #[test]
    fn test_format_mux_and_viki_raw() {
        let text = format_result(BackendId::Mux, "f.mp4", 10, &UploadResult::success("up-123"));
        assert!(text.contains("Upload ID: up-123"));

        let viki = UploadResult::success("").with_extra("raw_response", json!({"hash": "z"}));
        let text = format_result(BackendId::Viki, "f.mp4", 10, &viki);
        assert!(text.contains(r#"{"hash":"z"}"#));
    }

    #[test]
    fn test_format_truncates_long_text() {
        let text = format_result(BackendId::Voe, "a", 0, &UploadResult::failure("x".repeat(10_000)));
        assert_eq!(text.chars().count(), MAX_MESSAGE_CHARS);
    }
}
