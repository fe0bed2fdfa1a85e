//! Download progress notifications
//!
//! Progress is best-effort: sinks receive a percentage per target filename,
//! at least once with `100` when an item completes, and otherwise at
//! irregular intervals while bytes arrive.

use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Percentage reported while bytes are still arriving
///
/// The remaining 2% is held back for post-processing such as thumbnail
/// generation.
pub const MAX_STREAMING_PROGRESS: u8 = 98;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub filename: String,
    pub percent: u8,
}

/// Receiver of progress notifications (typically a UI)
pub trait ProgressSink: Send + Sync {
    fn report(&self, filename: &str, percent: u8);
}

/// Sink that only logs at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, filename: &str, percent: u8) {
        debug!("{}: {}%", filename, percent);
    }
}

/// Sink forwarding updates into an unbounded channel
///
/// Updates are dropped silently once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, filename: &str, percent: u8) {
        let _ = self.sender.send(ProgressUpdate {
            filename: filename.to_string(),
            percent,
        });
    }
}

/// Sink that keeps every update in memory
#[derive(Debug, Default)]
pub struct CollectingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Last percentage reported for `filename`
    pub fn last_percent(&self, filename: &str) -> Option<u8> {
        self.updates()
            .iter()
            .rev()
            .find(|u| u.filename == filename)
            .map(|u| u.percent)
    }
}

impl ProgressSink for CollectingProgress {
    fn report(&self, filename: &str, percent: u8) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ProgressUpdate {
                filename: filename.to_string(),
                percent,
            });
    }
}

/// Streaming progress for `downloaded` out of `total` bytes, capped at 98%
///
/// Returns `None` when the total size is unknown.
pub fn streaming_percent(downloaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = downloaded.saturating_mul(100) / total;
    Some(percent.min(u64::from(MAX_STREAMING_PROGRESS)) as u8)
}
