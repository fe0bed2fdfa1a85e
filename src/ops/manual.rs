//! User-driven changes to a week's media: uploads, removals and songs

use super::MediaService;
use crate::catalog::{generate_reference_url, SONG_PUBLICATION};
use crate::metadata::{union_results, MetadataStore};
use crate::model::{week_context, MediaEntry, MediaKind, ParsedMedia, ParsingResult, ProcessedResult, WeekType};
use crate::package::{self, PackageItem, PackageKind};
use crate::parsers::song_label;
use crate::store::AssetStore;
use crate::Result;
use chrono::NaiveDate;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Staging context for songs added by hand
pub const SONGS_CONTEXT: &str = "songs-temp";

/// Staging context for the contents of uploaded packages
pub const PACKAGE_CONTEXT: &str = "jwpub-temp";

/// A local file to add to a week's media
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub source: PathBuf,
    pub group: String,
    pub label: String,
    /// Name inside the context directory; sanitized when queued
    pub filename: String,
}

impl UploadFile {
    /// Upload keeping the source's file name
    pub fn new(source: impl Into<PathBuf>, group: impl Into<String>, label: impl Into<String>) -> Self {
        let source = source.into();
        let filename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source,
            group: group.into(),
            label: label.into(),
            filename,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

async fn upload_result(store: &AssetStore, file: &UploadFile) -> Result<ProcessedResult> {
    let upload = store.enqueue_upload(&file.source, &file.filename).await?;

    let mut media = ParsedMedia::complete(&upload.path);
    if matches!(upload.kind, MediaKind::Video | MediaKind::Audio) {
        match store.probe().duration(&file.source).await {
            Ok(duration) if duration > 0.0 => media = media.with_duration(duration),
            Ok(_) => {}
            Err(e) => warn!("Could not read duration of {}: {}", file.source.display(), e),
        }
    }

    let mut entries: Vec<MediaEntry> = MediaEntry::file(upload.kind, media).into_iter().collect();
    if let Some(thumbnail) = upload.thumbnail {
        entries.extend(MediaEntry::file(MediaKind::Image, ParsedMedia::complete(thumbnail)));
    }

    Ok(ProcessedResult::manual(ParsingResult::new(
        file.group.as_str(),
        file.label.as_str(),
        upload.kind,
        entries,
    )))
}

/// Whether `stored` is the entry `item` refers to
fn is_same_item(stored: &ProcessedResult, item: &ProcessedResult) -> bool {
    match (&stored.result.uid, &item.result.uid) {
        (Some(a), Some(b)) => a == b,
        (None, None) => stored.result == item.result,
        _ => false,
    }
}

impl MediaService {
    /// Copies local files into a week's context as manual entries
    ///
    /// Media kinds are decided from file content; videos get a thumbnail.
    /// Publication (`.jwpub`) and playlist (`.jwlplaylist`) packages are
    /// replaced by the media they hold, each labelled by its file name,
    /// playlist label or catalog title. Returns the persisted metadata.
    pub async fn upload_media(
        &self,
        date: NaiveDate,
        week_type: WeekType,
        files: &[UploadFile],
    ) -> Result<Vec<ProcessedResult>> {
        if !files.iter().any(|file| PackageKind::from_path(&file.source).is_some()) {
            return self.upload_files(date, week_type, files).await;
        }

        let staging = self.store(PACKAGE_CONTEXT);
        let uploaded = match self.expand_packages(files, &staging).await {
            Ok(expanded) => self.upload_files(date, week_type, &expanded).await,
            Err(e) => Err(e),
        };

        staging.enqueue_delete(".")?;
        staging.flush().await;

        uploaded
    }

    /// Replaces every package of `files` by its media, unpacked or
    /// downloaded into `staging`
    async fn expand_packages(&self, files: &[UploadFile], staging: &AssetStore) -> Result<Vec<UploadFile>> {
        let dir = staging.target_dir()?;
        staging.ensure_directory(&dir).await?;

        let mut expanded = Vec::new();
        let mut downloaded = Vec::new();
        for file in files {
            let Some(kind) = PackageKind::from_path(&file.source) else {
                expanded.push(file.clone());
                continue;
            };

            info!("Extracting media from {}", file.source.display());
            for item in package::extract(kind, &file.source, &dir).await? {
                match item {
                    PackageItem::File { path, label } => {
                        expanded.push(UploadFile::new(path, file.group.as_str(), label));
                    }
                    PackageItem::Reference { key_symbol, track } => {
                        let handle = generate_reference_url(&key_symbol, track, None);
                        if let Some(video) = self.resolver.resolve(&handle, staging).await {
                            downloaded.push(video.path.clone());
                            expanded.push(UploadFile::new(video.path, file.group.as_str(), video.title));
                        }
                    }
                }
            }
        }

        let count = staging.flush().await;
        debug!("Downloaded {} package media items", count);

        let mut kept = Vec::with_capacity(expanded.len());
        for file in expanded {
            if downloaded.contains(&file.source) && tokio::fs::metadata(&file.source).await.is_err() {
                warn!("{} was not downloaded", file.source.display());
                continue;
            }
            kept.push(file);
        }
        Ok(kept)
    }

    async fn upload_files(
        &self,
        date: NaiveDate,
        week_type: WeekType,
        files: &[UploadFile],
    ) -> Result<Vec<ProcessedResult>> {
        info!("Uploading files for date: {}", date.format("%Y-%m-%d"));

        let store = self.store(week_context(date, week_type));
        let metadata = MetadataStore::for_store(&store)?;
        let loaded = metadata.load(false).await.unwrap_or_default();

        let uploaded = join_all(files.iter().map(|file| upload_result(&store, file))).await;

        info!("Starting to upload");
        let count = store.flush().await;
        info!("Uploaded {} media items", count);

        let uploaded = uploaded.into_iter().collect::<Result<Vec<_>>>()?;
        let merged = union_results(loaded, uploaded);
        if !merged.is_empty() {
            metadata.save(&merged).await?;
        }

        Ok(merged)
    }

    /// Deletes the files of `item` and drops it from a week's metadata
    ///
    /// Entries are matched by uid, or structurally for entries without one.
    /// Returns the remaining metadata.
    pub async fn remove_media(
        &self,
        item: &ProcessedResult,
        date: NaiveDate,
        week_type: WeekType,
    ) -> Result<Vec<ProcessedResult>> {
        info!("Deleting file for date: {}", date.format("%Y-%m-%d"));

        let store = self.store(week_context(date, week_type));
        let metadata = MetadataStore::for_store(&store)?;
        let loaded = metadata.load(false).await.unwrap_or_default();

        let queued: Vec<_> = item
            .result
            .media_paths()
            .filter_map(Path::file_name)
            .map(|name| store.enqueue_delete(name))
            .collect();

        info!("Starting to delete");
        let count = store.flush().await;
        info!("Deleted {} media items", count);

        for result in queued {
            result?;
        }

        let remaining: Vec<ProcessedResult> = loaded
            .into_iter()
            .filter(|stored| !is_same_item(stored, item))
            .collect();
        metadata.save(&remaining).await?;

        Ok(remaining)
    }

    /// Adds a songbook video to a week's media under `group`
    ///
    /// The video is first downloaded into a staging context, then uploaded
    /// like a user file. Returns `None` when the song cannot be resolved or
    /// downloaded.
    pub async fn add_song(
        &self,
        date: NaiveDate,
        week_type: WeekType,
        group: &str,
        song: u32,
    ) -> Result<Option<Vec<ProcessedResult>>> {
        let staging = self.store(SONGS_CONTEXT);
        let handle = generate_reference_url(SONG_PUBLICATION, song, None);
        let video = self.resolver.resolve(&handle, &staging).await;
        staging.flush().await;

        let video = match video {
            Some(video) => video,
            None => return Ok(None),
        };
        if tokio::fs::metadata(&video.path).await.is_err() {
            warn!("Song {} was not downloaded", song);
            return Ok(None);
        }

        let file = UploadFile::new(&video.path, group, song_label(song, &video.title));
        let uploaded = self.upload_media(date, week_type, std::slice::from_ref(&file)).await;

        staging.enqueue_delete(".")?;
        staging.flush().await;

        uploaded.map(Some)
    }
}
