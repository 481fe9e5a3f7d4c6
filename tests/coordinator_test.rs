//! Job lifecycle tests: state machine, status texts and temp file cleanup
//!
//! Run with: cargo test --test coordinator_test

mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;

use common::{video_reference, FakeAcquirer, FakeBackend, RecordingSink};
use upmirror::upload::job::JobState;
use upmirror::upload::{BackendId, BackendRegistry, Coordinator, UploadJob, UploadResult};

fn coordinator(acquirer: FakeAcquirer, backend: Arc<FakeBackend>) -> Coordinator {
    let mut registry = BackendRegistry::new();
    registry.register(backend);
    Coordinator::new(Arc::new(acquirer), registry)
}

#[tokio::test]
async fn test_success_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Gofile, UploadResult::success("https://store/x/clip.mp4"));
    let coordinator = coordinator(FakeAcquirer::ok(4096), backend.clone());
    let sink = Arc::new(RecordingSink::default());

    let mut job = UploadJob::new(BackendId::Gofile, video_reference(10, "clip.mp4", 4096), dir.path());
    let result = coordinator.run(&mut job, sink.clone()).await;

    assert!(result.is_success());
    assert_eq!(job.state(), &JobState::Done(result.clone()));
    assert!(!job.local_path.exists(), "temp file must be gone after success");
    assert_eq!(backend.calls(), 1);

    // The backend saw the downloaded file under the display name
    let (path, existed, filename) = backend.saw_file.lock().unwrap().clone().unwrap();
    assert_eq!(path, job.local_path);
    assert!(existed);
    assert_eq!(filename, "clip.mp4");
}

#[tokio::test]
async fn test_backend_failure_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Voe, UploadResult::failure("server error"));
    let coordinator = coordinator(FakeAcquirer::ok(1024), backend.clone());
    let sink = Arc::new(RecordingSink::default());

    let mut job = UploadJob::new(BackendId::Voe, video_reference(11, "clip.mp4", 1024), dir.path());
    let result = coordinator.run(&mut job, sink.clone()).await;

    assert_eq!(result.reason(), Some("server error"));
    assert!(!job.local_path.exists(), "temp file must be gone after failure");
    assert_eq!(sink.last().as_deref(), Some("❌ VOE upload failed: server error"));
}

#[tokio::test]
async fn test_acquisition_failure_skips_upload_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Mixdrop, UploadResult::success("unused"));
    let coordinator = coordinator(FakeAcquirer::failing(), backend.clone());
    let sink = Arc::new(RecordingSink::default());

    let mut job = UploadJob::new(BackendId::Mixdrop, video_reference(12, "clip.mp4", 10), dir.path());
    let result = coordinator.run(&mut job, sink.clone()).await;

    assert!(!result.is_success());
    assert!(result.reason().unwrap_or_default().starts_with("download failed"));
    assert_eq!(backend.calls(), 0);
    assert!(!job.local_path.exists(), "partial file must be removed");
    assert!(matches!(job.state(), JobState::Done(UploadResult::Failure { .. })));
}

#[tokio::test]
async fn test_unregistered_backend_fails_without_download() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Gofile, UploadResult::success("unused"));
    let coordinator = coordinator(FakeAcquirer::ok(10), backend.clone());
    let sink = Arc::new(RecordingSink::default());

    let mut job = UploadJob::new(BackendId::Viki, video_reference(13, "clip.mp4", 10), dir.path());
    let result = coordinator.run(&mut job, sink.clone()).await;

    assert_eq!(result.reason(), Some("backend not configured"));
    assert_eq!(backend.calls(), 0);
    assert_eq!(sink.texts().len(), 1, "only the final text is posted");
}

#[tokio::test]
async fn test_status_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Gofile, UploadResult::success("https://store/x/clip.mp4"));
    let coordinator = coordinator(FakeAcquirer::ok(10 * 1024 * 1024), backend);
    let sink = Arc::new(RecordingSink::default());

    let mut job = UploadJob::new(BackendId::Gofile, video_reference(14, "clip.mp4", 10 * 1024 * 1024), dir.path());
    coordinator.run(&mut job, sink.clone()).await;

    let texts = sink.texts();
    assert!(texts[0].starts_with("📥 Downloading media..."));
    assert!(texts.iter().any(|t| t.starts_with("🔽 Downloading: clip.mp4")));
    let uploading = texts.iter().position(|t| t.starts_with("⏫ Uploading to GoFile")).unwrap();
    let last_progress = texts.iter().rposition(|t| t.starts_with("🔽")).unwrap();
    assert!(last_progress < uploading, "progress edits must precede the upload phase");
    assert!(texts.last().unwrap().starts_with("✅ Uploaded successfully!"));
    assert!(texts.last().unwrap().contains("10.0 MB"));
}

#[tokio::test]
async fn test_concurrent_jobs_use_distinct_paths() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::new(BackendId::Gofile, UploadResult::success("https://store/x"));
    let coordinator = coordinator(FakeAcquirer::ok(2048), backend.clone());

    let mut a = UploadJob::new(BackendId::Gofile, video_reference(20, "same.mp4", 2048), dir.path());
    let mut b = UploadJob::new(BackendId::Gofile, video_reference(20, "same.mp4", 2048), dir.path());
    assert_ne!(a.local_path, b.local_path);

    let sink_a = Arc::new(RecordingSink::default());
    let sink_b = Arc::new(RecordingSink::default());
    let (ra, rb) = tokio::join!(coordinator.run(&mut a, sink_a), coordinator.run(&mut b, sink_b));

    assert!(ra.is_success() && rb.is_success());
    assert_eq!(backend.calls(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
