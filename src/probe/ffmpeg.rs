use super::{write_placeholder, MediaProbe, ProbeError, Thumbnail, THUMBNAIL_SIZE};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Seconds into the video used for the fallback frame grab
const FALLBACK_TIMEMARK: f64 = 8.0;

/// Probe backed by the `ffmpeg` and `ffprobe` executables
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegProbe {
    /// Uses explicit executable paths instead of looking them up on `PATH`
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn scale_filter() -> String {
        format!(
            "scale={s}:{s}:force_original_aspect_ratio=decrease,pad={s}:{s}:(ow-iw)/2:(oh-ih)/2",
            s = THUMBNAIL_SIZE
        )
    }

    /// Extracts the cover image embedded in the container, if any
    async fn extract_attached_picture(&self, video: &Path, output: &Path) -> Result<(), ProbeError> {
        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(video)
            .args(["-map", "0:v", "-map", "-0:V", "-frames:v", "1", "-vf"])
            .arg(Self::scale_filter())
            .arg(output)
            .output()
            .await?;

        ensure_success("ffmpeg", video, &result)
    }

    /// Grabs a single frame a few seconds into the video
    async fn grab_frame(&self, video: &Path, output: &Path) -> Result<(), ProbeError> {
        let duration = self.duration(video).await.unwrap_or(0.0);
        let timemark = FALLBACK_TIMEMARK.min(duration.floor()).max(0.0);

        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.3}", timemark))
            .arg("-i")
            .arg(video)
            .args(["-frames:v", "1", "-vf"])
            .arg(Self::scale_filter())
            .arg(output)
            .output()
            .await?;

        ensure_success("ffmpeg", video, &result)
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await?;

        ensure_success("ffprobe", path, &output)?;

        let data: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| ProbeError::Failed {
                tool: "ffprobe",
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0))
    }

    async fn generate_thumbnail(&self, video: &Path, output: &Path) -> Result<Thumbnail, ProbeError> {
        match self.extract_attached_picture(video, output).await {
            Ok(()) => return Ok(Thumbnail::Rendered),
            Err(e) => debug!("No attached picture in {}: {}", video.display(), e),
        }

        match self.grab_frame(video, output).await {
            Ok(()) if tokio::fs::metadata(output).await.map(|m| m.is_file()).unwrap_or(false) => {
                Ok(Thumbnail::Rendered)
            }
            Ok(()) => {
                write_placeholder(output).await?;
                Ok(Thumbnail::Placeholder)
            }
            Err(e) => {
                warn!("Falling back to placeholder thumbnail for {}: {}", video.display(), e);
                write_placeholder(output).await?;
                Ok(Thumbnail::Placeholder)
            }
        }
    }
}

fn ensure_success(
    tool: &'static str,
    path: &Path,
    output: &std::process::Output,
) -> Result<(), ProbeError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(ProbeError::Failed {
            tool,
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
