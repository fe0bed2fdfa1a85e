/// Media definitions for crawled and uploaded assets
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Classification of a media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    /// Inline verse text with an audio timeline; never downloaded
    Text,
}

impl MediaKind {
    /// Returns true for kinds that are backed by a local file
    pub fn is_downloadable(&self) -> bool {
        !matches!(self, Self::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media file stored on the local filesystem
///
/// Optional fields may be absent on metadata written by older versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMedia {
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Milliseconds since the Unix epoch at which the entry was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_progress: Option<u8>,
}

impl ParsedMedia {
    /// Creates an entry for a file that is queued but not yet downloaded
    pub fn pending(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: None,
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
            download_progress: Some(0),
        }
    }

    /// Creates an entry for a file that is already complete on disk
    pub fn complete(path: impl Into<PathBuf>) -> Self {
        Self {
            download_progress: Some(100),
            ..Self::pending(path)
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Time-coded position of one verse inside a chapter recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseMarker {
    pub verse_number: u32,
    pub start_time: String,
    pub duration: String,
}

/// Verse-range text paired with the chapter's audio timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedText {
    pub booknum: u32,
    pub chapter: u32,
    pub verses: Vec<u32>,
    pub content: String,
    #[serde(rename = "audioURL")]
    pub audio_url: String,
    pub duration: f64,
    pub markers: Vec<VerseMarker>,
}

/// One slot of a result's `media` list, tagged by its `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaEntry {
    Image(ParsedMedia),
    Video(ParsedMedia),
    Audio(ParsedMedia),
    Text(ParsedText),
}

impl MediaEntry {
    /// Builds a file-backed entry of the given kind
    ///
    /// Text has no file representation, so a `Text` kind yields `None`.
    pub fn file(kind: MediaKind, media: ParsedMedia) -> Option<Self> {
        match kind {
            MediaKind::Image => Some(Self::Image(media)),
            MediaKind::Video => Some(Self::Video(media)),
            MediaKind::Audio => Some(Self::Audio(media)),
            MediaKind::Text => None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
            Self::Text(_) => MediaKind::Text,
        }
    }

    pub fn as_file(&self) -> Option<&ParsedMedia> {
        match self {
            Self::Image(m) | Self::Video(m) | Self::Audio(m) => Some(m),
            Self::Text(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut ParsedMedia> {
        match self {
            Self::Image(m) | Self::Video(m) | Self::Audio(m) => Some(m),
            Self::Text(_) => None,
        }
    }

    /// Local path of the entry, if it is file-backed
    pub fn path(&self) -> Option<&Path> {
        self.as_file().map(|m| m.path.as_path())
    }
}
