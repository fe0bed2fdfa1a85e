/// Grouped parser output and its persisted form
use super::media::{MediaEntry, MediaKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Separator used when nesting group headings
pub const GROUP_SEPARATOR: &str = " :: ";

/// A labelled set of media extracted from one page section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Hierarchical, human-readable section label (`Parent :: Child`)
    pub group: String,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    pub media: Vec<MediaEntry>,
}

impl ParsingResult {
    /// Creates a result and assigns it a uid derived from its content
    pub fn new(group: impl Into<String>, label: impl Into<String>, kind: MediaKind, media: Vec<MediaEntry>) -> Self {
        let group = group.into();
        let label = label.into();
        let uid = result_uid(&group, &label, &media);
        Self {
            uid: Some(uid),
            alt: None,
            group,
            label,
            kind,
            media,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Re-groups this result under a parent heading
    ///
    /// The parent heading replaces the group when it already contains the
    /// child's group, so a segment is never repeated.
    pub fn regroup_under(mut self, parent: &str) -> Self {
        self.group = if parent.contains(&self.group) {
            parent.to_string()
        } else {
            [parent, &self.group].join(GROUP_SEPARATOR)
        };
        self
    }

    /// Local paths of every file-backed media entry
    pub fn media_paths(&self) -> impl Iterator<Item = &std::path::Path> {
        self.media.iter().filter_map(MediaEntry::path)
    }
}

/// A parsing result as persisted in a context's metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    #[serde(flatten)]
    pub result: ParsingResult,

    /// Set for entries added by the user rather than by crawling
    #[serde(default)]
    pub manual: bool,
}

impl ProcessedResult {
    pub fn crawled(result: ParsingResult) -> Self {
        Self {
            result,
            manual: false,
        }
    }

    pub fn manual(result: ParsingResult) -> Self {
        Self {
            result,
            manual: true,
        }
    }

    /// Key used for the second deduplication pass of a merge
    pub fn merge_key(&self) -> MergeKey {
        let mut paths: Vec<PathBuf> = self.result.media_paths().map(PathBuf::from).collect();
        paths.sort();
        MergeKey {
            group: self.result.group.clone(),
            kind: self.result.kind,
            label: self.result.label.clone(),
            paths,
        }
    }
}

/// Identity of a result irrespective of timestamps and progress
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub group: String,
    pub kind: MediaKind,
    pub label: String,
    pub paths: Vec<PathBuf>,
}

/// Computes a stable uid (hex SHA-256) from a result's group, label and media paths
pub fn result_uid(group: &str, label: &str, media: &[MediaEntry]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(group.as_bytes());
    hasher.update([0]);
    hasher.update(label.as_bytes());
    for entry in media {
        hasher.update([0]);
        match entry.path() {
            Some(path) => hasher.update(path.to_string_lossy().as_bytes()),
            None => hasher.update(entry.kind().as_str().as_bytes()),
        }
    }
    hex::encode(&hasher.finalize()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParsedMedia;

    fn image(path: &str) -> MediaEntry {
        MediaEntry::Image(ParsedMedia::pending(path))
    }

    #[test]
    fn test_uid_is_stable() {
        let a = ParsingResult::new("G", "L", MediaKind::Image, vec![image("/a.jpg")]);
        let b = ParsingResult::new("G", "L", MediaKind::Image, vec![image("/a.jpg")]);
        assert_eq!(a.uid, b.uid);

        let c = ParsingResult::new("G", "L", MediaKind::Image, vec![image("/b.jpg")]);
        assert_ne!(a.uid, c.uid);
    }

    #[test]
    fn test_regroup_joins_with_separator() {
        let result = ParsingResult::new("Article", "L", MediaKind::Image, vec![]);
        assert_eq!(result.regroup_under("Talk").group, "Talk :: Article");
    }

    #[test]
    fn test_regroup_avoids_duplicate_segment() {
        let result = ParsingResult::new("Article", "L", MediaKind::Image, vec![]);
        assert_eq!(result.regroup_under("1. Article").group, "1. Article");
    }

    #[test]
    fn test_processed_result_flattens_fields() {
        let processed = ProcessedResult::manual(ParsingResult::new(
            "A",
            "Label",
            MediaKind::Image,
            vec![image("/a.jpg")],
        ));
        let json = serde_json::to_value(&processed).unwrap();
        assert_eq!(json["group"], "A");
        assert_eq!(json["type"], "image");
        assert_eq!(json["manual"], true);

        let back: ProcessedResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, processed);
    }

    #[test]
    fn test_missing_manual_defaults_to_false() {
        let json = r#"{"group":"A","label":"L","type":"video","media":[]}"#;
        let processed: ProcessedResult = serde_json::from_str(json).unwrap();
        assert!(!processed.manual);
        assert!(processed.result.uid.is_none());
    }

    #[test]
    fn test_merge_key_ignores_timestamps_and_order() {
        let mut first = ParsedMedia::pending("/b.png");
        first.timestamp = Some(1);
        let mut second = ParsedMedia::pending("/b.png");
        second.timestamp = Some(2);

        let a = ProcessedResult::crawled(ParsingResult::new(
            "G",
            "L",
            MediaKind::Video,
            vec![MediaEntry::Video(ParsedMedia::pending("/a.mp4")), MediaEntry::Image(first)],
        ));
        let b = ProcessedResult::crawled(ParsingResult::new(
            "G",
            "L",
            MediaKind::Video,
            vec![MediaEntry::Image(second), MediaEntry::Video(ParsedMedia::pending("/a.mp4"))],
        ));
        assert_ne!(a, b);
        assert_eq!(a.merge_key(), b.merge_key());
    }
}
