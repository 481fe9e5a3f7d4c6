use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::config::progress::{max_silence, BAR_CELLS, CHANNEL_CAPACITY, MIN_PERCENT_STEP};
use crate::core::error::AppResult;
use crate::core::utils::{bytes_to_mb, format_hms, BYTES_PER_MB};
use crate::download::ProgressSample;

/// Editable status message of a job.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Replaces the status text.
    async fn update(&self, text: &str) -> AppResult<()>;
}

/// Replaces the status text, logging a failed edit instead of returning it.
pub async fn push(sink: &dyn StatusSink, text: &str) {
    if let Err(e) = sink.update(text).await {
        log::warn!("Status update dropped: {}", e);
    }
}

/// Creates the bounded acquirer -> reporter channel.
pub fn channel() -> (mpsc::Sender<ProgressSample>, mpsc::Receiver<ProgressSample>) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Creates a 20-cell `█`/`░` bar.
fn create_progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * BAR_CELLS / 100;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Rate-limited renderer of transfer progress.
///
/// A status is produced when the percent moved by at least
/// [`MIN_PERCENT_STEP`] since the last one, or when [`max_silence`]
/// passed. Time is taken from the samples, so the reporter is
/// deterministic under test.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    operation: String,
    filename: String,
    last_percent: u8,
    last_at: Duration,
}

impl ProgressReporter {
    /// `operation` is the header verb, e.g. "Downloading".
    pub fn new(operation: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            filename: filename.into(),
            last_percent: 0,
            last_at: Duration::ZERO,
        }
    }

    /// Returns the rendered status if this sample should be shown.
    pub fn report(&mut self, sample: &ProgressSample) -> Option<String> {
        let percent = sample.percent();
        let advanced = percent.saturating_sub(self.last_percent) >= MIN_PERCENT_STEP;
        let silent_for = sample.elapsed.saturating_sub(self.last_at);
        if !advanced && silent_for < max_silence() {
            return None;
        }
        self.last_percent = percent;
        self.last_at = sample.elapsed;
        Some(self.render(sample))
    }

    pub fn render(&self, sample: &ProgressSample) -> String {
        let percent = sample.percent();
        let secs = sample.elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            sample.bytes_transferred as f64 / secs
        } else {
            0.0
        };
        let eta = if speed > 0.0 && sample.bytes_total > 0 {
            let remaining = sample.bytes_total.saturating_sub(sample.bytes_transferred) as f64;
            format_hms((remaining / speed) as u64)
        } else {
            "unknown".to_string()
        };

        format!(
            "🔽 {}: {}\n\n{} {}%\n📊 {:.1} / {:.1} MB\n⚡ {:.1} MB/s\n⏱ ETA: {}",
            self.operation,
            self.filename,
            create_progress_bar(percent),
            percent,
            bytes_to_mb(sample.bytes_transferred),
            bytes_to_mb(sample.bytes_total),
            speed / BYTES_PER_MB,
            eta
        )
    }
}

/// Drains the channel on its own task, pushing emitted statuses to `sink`.
///
/// Sink failures are logged and never stop the job. The task ends when
/// every sender is dropped and resolves to the number of emitted statuses.
pub fn spawn_reporter(
    mut reporter: ProgressReporter,
    mut rx: mpsc::Receiver<ProgressSample>,
    sink: Arc<dyn StatusSink>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut emitted = 0usize;
        while let Some(sample) = rx.recv().await {
            let Some(text) = reporter.report(&sample) else {
                continue;
            };
            emitted += 1;
            if let Err(e) = sink.update(&text).await {
                log::debug!("Progress update dropped: {}", e);
            }
        }
        emitted
    })
}
