//! Asset store: per-context local storage with queued I/O
//!
//! The store owns one target directory per context below the managed
//! storage root. Downloads, uploads and deletions are only *queued* while a
//! crawl runs; [`AssetStore::flush`] performs all of them concurrently.
//!
//! # Example
//!
//! ```no_run
//! use meeting_media::store::AssetStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = AssetStore::new("/tmp/meeting-media/files", reqwest::Client::new());
//! store.set_context("2024-20--1");
//!
//! let asset = store.enqueue_download("https://cdn.example.com/video.mp4", "mp4").await?;
//! println!("will download to {}", asset.path.display());
//!
//! let processed = store.flush().await;
//! println!("processed {} items", processed);
//! # Ok(())
//! # }
//! ```

mod filename;
mod progress;
mod queue;
mod sniff;
mod transfer;

pub use filename::{filename_from_url, sanitize_filename, thumbnail_path, with_extension, THUMBNAIL_SUFFIX};
pub use progress::{
    streaming_percent, ChannelProgress, CollectingProgress, LogProgress, ProgressSink, ProgressUpdate,
    MAX_STREAMING_PROGRESS,
};
pub use queue::{Download, OperationQueue, QueuedOperation, Upload};
pub use sniff::{classify_bytes, decide_file_media_type};

use crate::config::StorageConfig;
use crate::model::MediaKind;
use crate::probe::{FfmpegProbe, MediaProbe};
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur in the asset store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No context set; call set_context before enqueuing")]
    NoContext,

    #[error("Path escapes the managed storage root: {0}")]
    OutsideRoot(PathBuf),

    #[error("No usable filename in '{0}'")]
    InvalidFilename(String),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No data from {url} for {timeout:?}")]
    Stalled { url: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for asset store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Default longest wait for the next chunk of a download
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Location assigned to an enqueued asset
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueuedAsset {
    pub path: PathBuf,
    /// Present when the asset is a video
    pub thumbnail: Option<PathBuf>,
}

/// Location and classification of an enqueued upload
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueuedUpload {
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub kind: MediaKind,
}

/// Queue sizes at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub downloads: usize,
    pub uploads: usize,
    pub deletes: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.downloads + self.uploads + self.deletes
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lexically resolves `.` and `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize_lexically(&cwd.join(path))
    }
}

/// Per-context asset store with idempotent download, upload and delete queues
pub struct AssetStore {
    root: PathBuf,
    context: Option<String>,
    client: Client,
    read_timeout: Duration,
    library_dir: Option<PathBuf>,
    mirror_origins: Vec<String>,
    probe: Arc<dyn MediaProbe>,
    progress: Arc<dyn ProgressSink>,
    dirs_created: Mutex<HashSet<PathBuf>>,
    downloads: Mutex<OperationQueue<Download>>,
    uploads: Mutex<OperationQueue<Upload>>,
    deletes: Mutex<OperationQueue<()>>,
}

impl AssetStore {
    /// Creates a store rooted at `root` (the managed storage root)
    ///
    /// `client` should not carry a whole-request timeout, see
    /// [`build_download_client`](crate::crawler::build_download_client).
    pub fn new(root: impl AsRef<Path>, client: Client) -> Self {
        Self {
            root: absolute(root.as_ref()),
            context: None,
            client,
            read_timeout: DEFAULT_READ_TIMEOUT,
            library_dir: None,
            mirror_origins: Vec::new(),
            probe: Arc::new(FfmpegProbe::default()),
            progress: Arc::new(LogProgress),
            dirs_created: Mutex::new(HashSet::new()),
            downloads: Mutex::new(OperationQueue::default()),
            uploads: Mutex::new(OperationQueue::default()),
            deletes: Mutex::new(OperationQueue::default()),
        }
    }

    /// Creates a store from the `[storage]` configuration section
    pub fn from_config(config: &StorageConfig, client: Client) -> Self {
        Self::new(&config.files_path, client)
            .with_library_dir(config.library_dir.clone())
            .with_mirror_origins(config.mirror_origins.clone())
    }

    pub fn with_library_dir(mut self, library_dir: Option<PathBuf>) -> Self {
        self.library_dir = library_dir;
        self
    }

    pub fn with_mirror_origins(mut self, origins: Vec<String>) -> Self {
        self.mirror_origins = origins;
        self
    }

    /// Fails a download when no data arrives for `timeout`
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Binds the store to the directory of context `name`
    pub fn set_context(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        info!("Target directory: \"{}\"", self.root.join(&name).display());
        self.context = Some(name);
        self
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn probe(&self) -> &Arc<dyn MediaProbe> {
        &self.probe
    }

    pub fn library_dir(&self) -> Option<&Path> {
        self.library_dir.as_deref()
    }

    /// Directory of the active context
    pub fn target_dir(&self) -> StoreResult<PathBuf> {
        let context = self.context.as_ref().ok_or(StoreError::NoContext)?;
        let dir = normalize_lexically(&self.root.join(context));
        if !dir.starts_with(&self.root) {
            return Err(StoreError::OutsideRoot(dir));
        }
        Ok(dir)
    }

    /// Creates `dir` (and parents) once per store lifetime
    pub async fn ensure_directory(&self, dir: &Path) -> StoreResult<()> {
        if lock(&self.dirs_created).contains(dir) {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir).await?;
        lock(&self.dirs_created).insert(dir.to_path_buf());
        Ok(())
    }

    /// Queues a download of `url` into the context directory
    ///
    /// The target name is the sanitized last URL segment, forced to end with
    /// `.{extension}`. Enqueuing the same target twice queues it once.
    pub async fn enqueue_download(&self, url: &str, extension: &str) -> StoreResult<EnqueuedAsset> {
        let raw = filename_from_url(url).ok_or_else(|| StoreError::InvalidFilename(url.to_string()))?;
        let filename = sanitize_filename(&raw).ok_or(StoreError::InvalidFilename(raw))?;
        let filename = with_extension(filename, extension);

        let dir = self.target_dir()?;
        let target_path = dir.join(&filename);
        let thumbnail = thumbnail_path(&target_path);

        self.ensure_directory(&dir).await?;

        let added = lock(&self.downloads).push(
            target_path.clone(),
            Download {
                url: url.to_string(),
                thumbnail: thumbnail.clone(),
            },
        );
        if added {
            debug!("Enqueued download {} -> {}", url, target_path.display());
        }

        Ok(EnqueuedAsset {
            path: target_path,
            thumbnail,
        })
    }

    /// Queues a copy of a local file into the context directory as `filename`
    pub async fn enqueue_upload(&self, source: &Path, filename: &str) -> StoreResult<EnqueuedUpload> {
        let sanitized = sanitize_filename(filename)
            .ok_or_else(|| StoreError::InvalidFilename(filename.to_string()))?;

        let dir = self.target_dir()?;
        let target_path = dir.join(sanitized);
        let kind = decide_file_media_type(source).await;
        let thumbnail = match kind {
            MediaKind::Video => thumbnail_path(&target_path),
            _ => None,
        };

        self.ensure_directory(&dir).await?;

        let added = lock(&self.uploads).push(
            target_path.clone(),
            Upload {
                source: source.to_path_buf(),
                thumbnail: thumbnail.clone(),
            },
        );
        if added {
            debug!("Enqueued file to upload {}", target_path.display());
        }

        Ok(EnqueuedUpload {
            path: target_path,
            thumbnail,
            kind,
        })
    }

    /// Queues deletion of `name`, relative to the context directory
    ///
    /// Paths that resolve outside the managed storage root (or to the root
    /// itself) are rejected and not queued. `"."` names the whole context
    /// directory.
    pub fn enqueue_delete(&self, name: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let target_path = normalize_lexically(&self.target_dir()?.join(name.as_ref()));

        if !target_path.starts_with(&self.root) || target_path == self.root {
            warn!("Refusing to delete outside storage root: {}", target_path.display());
            return Err(StoreError::OutsideRoot(target_path));
        }

        if lock(&self.deletes).push(target_path.clone(), ()) {
            debug!("Enqueued file to delete {}", target_path.display());
        }
        Ok(target_path)
    }

    /// Current queue sizes
    pub fn pending(&self) -> PendingCounts {
        PendingCounts {
            downloads: lock(&self.downloads).len(),
            uploads: lock(&self.uploads).len(),
            deletes: lock(&self.deletes).len(),
        }
    }

    /// Performs every queued operation concurrently
    ///
    /// Queues are emptied before any I/O starts. Individual failures are
    /// logged and leave that item's target absent; they never abort sibling
    /// items. Returns the number of items processed, not the number that
    /// succeeded.
    pub async fn flush(&self) -> usize {
        let deletes = lock(&self.deletes).drain();
        let uploads = lock(&self.uploads).drain();
        let downloads = lock(&self.downloads).drain();
        let count = deletes.len() + uploads.len() + downloads.len();

        let delete_all = join_all(deletes.iter().map(|op| self.run_delete(&op.target_path)));
        let upload_all = join_all(uploads.iter().map(|op| async move {
            if let Err(e) = self.run_upload(&op.target_path, &op.extra).await {
                warn!("Upload of {} failed: {}", op.target_path.display(), e);
                let _ = tokio::fs::remove_file(&op.target_path).await;
            }
        }));
        let download_all = join_all(downloads.iter().map(|op| async move {
            if let Err(e) = self.run_download(&op.target_path, &op.extra).await {
                warn!("Download of {} failed: {}", op.extra.url, e);
                let _ = tokio::fs::remove_file(&op.target_path).await;
            }
        }));

        tokio::join!(delete_all, upload_all, download_all);
        count
    }
}
