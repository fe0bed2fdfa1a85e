//! Media probing: durations and video thumbnails
//!
//! Probing is delegated to an external tool. The asset store only depends on
//! the [`MediaProbe`] trait, so tests can substitute [`NoopProbe`].

mod ffmpeg;

pub use ffmpeg::FfmpegProbe;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Edge length of generated thumbnails, in pixels
pub const THUMBNAIL_SIZE: u32 = 280;

/// 1x1 transparent PNG written when no thumbnail can be rendered
pub const PLACEHOLDER_THUMBNAIL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Errors reported by a media probe
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed for {path}: {message}")]
    Failed {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// How a thumbnail ended up on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumbnail {
    /// Rendered from the video itself
    Rendered,
    /// Rendering failed and the placeholder image was written instead
    Placeholder,
}

/// External media-probing collaborator
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration of an audio or video file, in seconds
    async fn duration(&self, path: &Path) -> Result<f64, ProbeError>;

    /// Renders a fixed-size thumbnail of `video` into `output`
    async fn generate_thumbnail(&self, video: &Path, output: &Path) -> Result<Thumbnail, ProbeError>;
}

/// Probe that renders nothing; thumbnails are always the placeholder
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

#[async_trait]
impl MediaProbe for NoopProbe {
    async fn duration(&self, _path: &Path) -> Result<f64, ProbeError> {
        Ok(0.0)
    }

    async fn generate_thumbnail(&self, _video: &Path, output: &Path) -> Result<Thumbnail, ProbeError> {
        write_placeholder(output).await?;
        Ok(Thumbnail::Placeholder)
    }
}

/// Writes the placeholder thumbnail to `output`
pub async fn write_placeholder(output: &Path) -> Result<(), ProbeError> {
    tokio::fs::write(output, PLACEHOLDER_THUMBNAIL).await?;
    Ok(())
}

/// Returns true if the path has a common video extension
pub fn is_video_file(path: &Path) -> bool {
    const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "wmv", "3gp", "mkv", "ogg"];

    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
