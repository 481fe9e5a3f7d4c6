//! Upload back-ends and the job coordinator.
//!
//! Every destination implements [`UploadBackend`]; the coordinator in [`job`]
//! only ever sees that trait, picked from the [`registry::BackendRegistry`] by
//! [`BackendId`].
//!
//! Built-in backends:
//! - `MultiupBackend`: multi-mirror host, 4-step login/server/hosts/project protocol
//! - `MixdropBackend`: single host locker, video whitelist
//! - `GofileBackend`: anonymous object store
//! - `VoeBackend`: video host with a per-upload server
//! - `VikiBackend`: single file share (VikingFile)
//! - `MuxBackend`: transcoding platform, used by `/muxup` only

pub mod extract;
pub mod gofile;
pub mod job;
pub mod mixdrop;
pub mod multiup;
pub mod mux;
pub mod registry;
pub mod viki;
pub mod voe;

use async_trait::async_trait;
use reqwest::multipart::Part;
use reqwest::{Body, Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::core::utils::truncate_chars;

pub use gofile::GofileBackend;
pub use job::{Coordinator, JobState, UploadJob};
pub use mixdrop::MixdropBackend;
pub use multiup::MultiupBackend;
pub use mux::MuxBackend;
pub use registry::BackendRegistry;
pub use viki::VikiBackend;
pub use voe::VoeBackend;

/// Longest raw body we keep in an error message.
const MAX_BODY_IN_ERROR: usize = 500;

/// Upload destination identifier, as used in callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum BackendId {
    Mixdrop,
    Multiup,
    Gofile,
    Voe,
    Viki,
    Mux,
}

impl BackendId {
    /// Backends offered by the `/up` menu, in button order.
    pub const MENU: [BackendId; 5] = [
        BackendId::Mixdrop,
        BackendId::Multiup,
        BackendId::Gofile,
        BackendId::Voe,
        BackendId::Viki,
    ];

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mixdrop => "MixDrop",
            Self::Multiup => "MultiUp",
            Self::Gofile => "GoFile",
            Self::Voe => "VOE",
            Self::Viki => "Viki",
            Self::Mux => "Mux",
        }
    }
}

/// Outcome of one adapter call. Never both a url and a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResult {
    Success {
        /// Primary link. For Mux this is the upload id; it may be empty for
        /// Viki when the response carried no link (see `extra["raw_response"]`).
        url: String,
        extra: Map<String, Value>,
    },
    Failure {
        reason: String,
    },
}

impl UploadResult {
    pub fn success(url: impl Into<String>) -> Self {
        Self::Success {
            url: url.into(),
            extra: Map::new(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure { reason: reason.into() }
    }

    /// Adds a metadata entry; no-op on failures.
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Self::Success { extra, .. } = &mut self {
            extra.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Success { url, .. } => Some(url),
            Self::Failure { .. } => None,
        }
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Success { extra, .. } => extra.get(key),
            Self::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }
}

impl From<UploadError> for UploadResult {
    fn from(err: UploadError) -> Self {
        UploadResult::failure(err.to_string())
    }
}

/// Failures of an upload job. All of them end as a chat message; none
/// propagate past the coordinator.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Replied-to message is gone or carries no media
    #[error("original file not found or it's not a media file")]
    ReferenceNotFound,

    /// Transport-level download failure
    #[error("download failed: {0}")]
    Acquisition(String),

    /// Non-2xx status or missing success indicator
    #[error("{backend} error: {message}")]
    Protocol { backend: &'static str, message: String },

    /// Body could not be decoded as JSON
    #[error("non-JSON response: {body}")]
    NonJson { body: String },

    /// A named step of a multi-step protocol failed
    #[error("{step} failed: {message}")]
    Step { step: &'static str, message: String },

    /// Backend reported success without a usable link
    #[error("no valid result: {0}")]
    NoValidResult(String),

    /// Extension rejected before any network call
    #[error("unsupported extension '{extension}' for {backend}")]
    UnsupportedFormat { backend: &'static str, extension: String },

    /// Local file rejected before any network call
    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Wraps an error as the failure of a named protocol step.
    pub fn at_step(step: &'static str, err: UploadError) -> Self {
        match err {
            already @ UploadError::Step { .. } => already,
            other => UploadError::Step {
                step,
                message: other.to_string(),
            },
        }
    }

    /// Tags the error of a step result, keeping the value on success.
    pub fn map_step<T>(step: &'static str, result: Result<T, UploadError>) -> Result<T, UploadError> {
        result.map_err(|e| Self::at_step(step, e))
    }

    pub fn protocol(backend: &'static str, message: impl Into<String>) -> Self {
        UploadError::Protocol {
            backend,
            message: message.into(),
        }
    }
}

/// Capability shared by every upload destination.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    fn id(&self) -> BackendId;

    fn display_name(&self) -> &'static str {
        self.id().display_name()
    }

    /// Performs the upload. Pre-flight checks must run before any request.
    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError>;

    /// Uploads `path`, announcing it as `filename`, and normalizes any error.
    async fn upload(&self, path: &Path, filename: &str) -> UploadResult {
        match self.try_upload(path, filename).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("❌ {} upload of {} failed: {}", self.display_name(), filename, e);
                UploadResult::from(e)
            }
        }
    }
}

/// Builds the HTTP client shared by an adapter.
pub(crate) fn http_client(timeout: Option<Duration>) -> Client {
    let mut builder = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; upmirror/0.3)")
        .connect_timeout(Duration::from_secs(30));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        log::warn!("HTTP client build failed ({}), using defaults", e);
        Client::new()
    })
}

/// Multipart part streaming the file from disk.
pub(crate) async fn file_part(path: &Path, filename: &str, mime: Option<&str>) -> Result<Part, UploadError> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len).file_name(filename.to_string());
    match mime {
        Some(m) => Ok(part.mime_str(m)?),
        None => Ok(part),
    }
}

/// Reads the body and decodes it as JSON whatever the status code.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<(StatusCode, Value), UploadError> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => Ok((status, json)),
        Err(_) => Err(UploadError::NonJson {
            body: truncate_chars(body.trim(), MAX_BODY_IN_ERROR),
        }),
    }
}

/// Fails on non-2xx statuses, quoting the backend's own error if present.
pub(crate) fn ensure_http_ok(backend: &'static str, status: StatusCode, json: &Value) -> Result<(), UploadError> {
    if status.is_success() {
        return Ok(());
    }
    Err(UploadError::protocol(
        backend,
        format!("HTTP {}: {}", status.as_u16(), extract::error_message(json)),
    ))
}

/// Truthiness of a JSON success flag (`true`, `1`, `"ok"`, `"true"`).
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "ok" | "true" | "success"),
        _ => false,
    }
}
