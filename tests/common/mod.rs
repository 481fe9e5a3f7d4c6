//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use upmirror::core::error::AppResult;
use upmirror::download::{MediaAcquirer, MediaKind, MediaReference, ProgressSample, StatusSink};
use upmirror::upload::{BackendId, UploadBackend, UploadError, UploadResult};

/// Writes `size` bytes into `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0x42u8; size]).expect("Failed to write fixture file");
    path
}

pub fn video_reference(message_id: i32, name: &str, size: u64) -> MediaReference {
    MediaReference {
        chat_id: 100,
        message_id,
        file_id: format!("BAACAgIAAxk-{}", message_id),
        file_name: Some(name.to_string()),
        file_size: Some(size),
        mime_type: Some("video/mp4".to_string()),
        kind: MediaKind::Video,
    }
}

/// Status sink that keeps every text it receives.
#[derive(Default)]
pub struct RecordingSink {
    texts: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("sink lock poisoned").clone()
    }

    pub fn last(&self) -> Option<String> {
        self.texts().last().cloned()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn update(&self, text: &str) -> AppResult<()> {
        self.texts.lock().expect("sink lock poisoned").push(text.to_string());
        Ok(())
    }
}

/// Acquirer writing `size` bytes in `chunks` steps, or failing outright.
pub struct FakeAcquirer {
    pub size: usize,
    pub chunks: usize,
    pub fail: bool,
}

impl FakeAcquirer {
    pub fn ok(size: usize) -> Self {
        Self {
            size,
            chunks: 10,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            size: 0,
            chunks: 0,
            fail: true,
        }
    }
}

#[async_trait]
impl MediaAcquirer for FakeAcquirer {
    async fn acquire(
        &self,
        _media: &MediaReference,
        dest: &Path,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<u64, UploadError> {
        if self.fail {
            // Leave a partial file behind, as a broken transfer would
            std::fs::write(dest, b"partial").map_err(|e| UploadError::Acquisition(e.to_string()))?;
            return Err(UploadError::Acquisition("connection reset".to_string()));
        }

        std::fs::write(dest, vec![0u8; self.size]).map_err(|e| UploadError::Acquisition(e.to_string()))?;
        let step = self.size / self.chunks.max(1);
        for i in 1..=self.chunks {
            let _ = progress
                .send(ProgressSample {
                    bytes_transferred: (step * i) as u64,
                    bytes_total: self.size as u64,
                    elapsed: Duration::from_millis(500 * i as u64),
                })
                .await;
        }
        Ok(self.size as u64)
    }
}

/// Backend answering with a fixed result and recording what it saw.
pub struct FakeBackend {
    pub id: BackendId,
    pub result: UploadResult,
    pub calls: AtomicUsize,
    pub saw_file: Mutex<Option<(PathBuf, bool, String)>>,
}

impl FakeBackend {
    pub fn new(id: BackendId, result: UploadResult) -> Arc<Self> {
        Arc::new(Self {
            id,
            result,
            calls: AtomicUsize::new(0),
            saw_file: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadBackend for FakeBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn try_upload(&self, path: &Path, filename: &str) -> Result<UploadResult, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.saw_file.lock().expect("backend lock poisoned") =
            Some((path.to_path_buf(), path.exists(), filename.to_string()));
        Ok(self.result.clone())
    }
}
