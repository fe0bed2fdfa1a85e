//! Execution of queued operations during a flush

use super::progress::streaming_percent;
use super::queue::{Download, Upload};
use super::sniff::decide_file_media_type;
use super::{AssetStore, StoreError, StoreResult};
use crate::model::MediaKind;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Optional copy of a download streamed into the media library
struct Mirror {
    file: File,
    partial: PathBuf,
    destination: PathBuf,
}

impl Mirror {
    async fn open(library: &Path, filename: &str) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(library).await?;
        let destination = library.join(filename);
        let partial = library.join(format!("{}.part", filename));
        let file = File::create(&partial).await?;
        Ok(Self {
            file,
            partial,
            destination,
        })
    }

    async fn finish(mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        drop(self.file);
        tokio::fs::rename(&self.partial, &self.destination).await
    }

    async fn abandon(self) {
        drop(self.file);
        let _ = tokio::fs::remove_file(&self.partial).await;
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl AssetStore {
    /// Deletes a file or directory; failures are advisory and only logged
    pub(super) async fn run_delete(&self, target: &Path) {
        let result = match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target).await,
            Ok(_) => tokio::fs::remove_file(target).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!("Deleted {}", target.display()),
            Err(e) => debug!("Could not delete {}: {}", target.display(), e),
        }
    }

    pub(super) async fn run_upload(&self, target: &Path, upload: &Upload) -> StoreResult<()> {
        tokio::fs::copy(&upload.source, target).await?;
        self.finish_asset(target, upload.thumbnail.as_deref()).await;
        Ok(())
    }

    /// Downloads one queued asset, preferring the local media library
    pub(super) async fn run_download(&self, target: &Path, download: &Download) -> StoreResult<()> {
        let filename = display_name(target);

        if let Some(cached) = self.library_copy(&filename).await {
            info!("Copying {} from media library", filename);
            tokio::fs::copy(&cached, target).await?;
        } else {
            self.stream_download(target, &filename, &download.url).await?;
        }

        self.finish_asset(target, download.thumbnail.as_deref()).await;
        Ok(())
    }

    /// Same-named file in the media library, if present
    async fn library_copy(&self, filename: &str) -> Option<PathBuf> {
        let candidate = self.library_dir.as_ref()?.join(filename);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => None,
        }
    }

    fn should_mirror(&self, url: &str) -> bool {
        self.library_dir.is_some() && self.mirror_origins.iter().any(|origin| url.contains(origin.as_str()))
    }

    async fn stream_download(&self, target: &Path, filename: &str, url: &str) -> StoreResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut mirror = match (&self.library_dir, self.should_mirror(url)) {
            (Some(library), true) => match Mirror::open(library, filename).await {
                Ok(mirror) => Some(mirror),
                Err(e) => {
                    warn!("Cannot mirror {} into media library: {}", filename, e);
                    None
                }
            },
            _ => None,
        };

        let mut file = File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_reported: Option<u8> = None;

        loop {
            let next = tokio::time::timeout(self.read_timeout, stream.next()).await;
            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(None) => break,
                Ok(Some(Err(source))) => {
                    if let Some(mirror) = mirror.take() {
                        mirror.abandon().await;
                    }
                    return Err(StoreError::Http {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(_) => {
                    if let Some(mirror) = mirror.take() {
                        mirror.abandon().await;
                    }
                    return Err(StoreError::Stalled {
                        url: url.to_string(),
                        timeout: self.read_timeout,
                    });
                }
            };

            file.write_all(&chunk).await?;

            if let Some(m) = mirror.as_mut() {
                if let Err(e) = m.file.write_all(&chunk).await {
                    warn!("Stopped mirroring {}: {}", filename, e);
                    if let Some(m) = mirror.take() {
                        m.abandon().await;
                    }
                }
            }

            downloaded += chunk.len() as u64;
            if let Some(percent) = streaming_percent(downloaded, total) {
                if last_reported.map_or(true, |last| percent > last) {
                    self.progress.report(filename, percent);
                    last_reported = Some(percent);
                }
            }
        }

        file.flush().await?;

        if let Some(mirror) = mirror {
            if let Err(e) = mirror.finish().await {
                warn!("Could not store {} in media library: {}", filename, e);
            }
        }

        debug!("Downloaded {} ({} bytes)", filename, downloaded);
        Ok(())
    }

    /// Post-processing shared by downloads and uploads, then reports 100%
    async fn finish_asset(&self, target: &Path, thumbnail: Option<&Path>) {
        if let Some(thumbnail) = thumbnail {
            if decide_file_media_type(target).await == MediaKind::Video {
                if let Err(e) = self.probe.generate_thumbnail(target, thumbnail).await {
                    warn!("Error generating thumbnail for {}: {}", display_name(target), e);
                }
            }
        }
        self.progress.report(&display_name(target), 100);
    }
}
