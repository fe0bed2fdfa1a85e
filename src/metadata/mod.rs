//! Metadata store and merge policy
//!
//! Each context directory holds one `metadata.json`: a JSON array of
//! [`ProcessedResult`]s.

use crate::model::{MergeKey, ProcessedResult};
use crate::parsers::SONGS_GROUP;
use crate::store::AssetStore;
use crate::Result;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the metadata file inside a context directory
pub const METADATA_FILENAME: &str = "metadata.json";

/// Persisted results of one context
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Metadata of the directory `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(METADATA_FILENAME),
        }
    }

    /// Metadata of the asset store's active context
    pub fn for_store(store: &AssetStore) -> Result<Self> {
        Ok(Self::new(store.target_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted results
    ///
    /// Returns `None` when the file is missing or unreadable; that is the
    /// "nothing cached yet" case, not an error. With `force`, only manual
    /// entries are kept.
    pub async fn load(&self, force: bool) -> Option<Vec<ProcessedResult>> {
        info!("Loading metadata from: {}", self.path.display());

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No metadata at {}: {}", self.path.display(), e);
                return None;
            }
        };
        let results: Vec<ProcessedResult> = match serde_json::from_str(&raw) {
            Ok(results) => results,
            Err(e) => {
                debug!("Unreadable metadata at {}: {}", self.path.display(), e);
                return None;
            }
        };

        Some(if force {
            results.into_iter().filter(|r| r.manual).collect()
        } else {
            results
        })
    }

    /// Overwrites the persisted results
    pub async fn save(&self, results: &[ProcessedResult]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string(results)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved {} results to {}", results.len(), self.path.display());
        Ok(())
    }
}

/// Structural union: every entry of `fresh`, then the entries of `loaded`
/// not already present
pub fn union_results(fresh: Vec<ProcessedResult>, loaded: Vec<ProcessedResult>) -> Vec<ProcessedResult> {
    let mut merged: Vec<ProcessedResult> = Vec::with_capacity(fresh.len() + loaded.len());
    for result in fresh.into_iter().chain(loaded) {
        if !merged.contains(&result) {
            merged.push(result);
        }
    }
    merged
}

/// Merges freshly crawled results with stored ones
///
/// After the structural union, entries sharing a [`MergeKey`] (group, type,
/// label, sorted media paths) are collapsed to the first one, unless a later
/// one is manual and the first is not. Songs come first; other groups follow
/// in natural order.
pub fn merge_results(fresh: Vec<ProcessedResult>, loaded: Vec<ProcessedResult>) -> Vec<ProcessedResult> {
    let mut seen: HashMap<MergeKey, usize> = HashMap::new();
    let mut merged: Vec<ProcessedResult> = Vec::new();
    for result in union_results(fresh, loaded) {
        match seen.entry(result.merge_key()) {
            Entry::Occupied(slot) => {
                let kept = &mut merged[*slot.get()];
                if result.manual && !kept.manual {
                    *kept = result;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(result);
            }
        }
    }

    merged.sort_by(|a, b| compare_groups(&a.result.group, &b.result.group));
    merged
}

fn compare_groups(a: &str, b: &str) -> Ordering {
    match (a == SONGS_GROUP, b == SONGS_GROUP) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => natural_cmp(a, b),
    }
}

/// Case-insensitive comparison where digit runs compare numerically
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_number(&mut left);
                let rn = take_number(&mut right);
                let ordering = ln
                    .trim_start_matches('0')
                    .len()
                    .cmp(&rn.trim_start_matches('0').len())
                    .then_with(|| ln.trim_start_matches('0').cmp(rn.trim_start_matches('0')));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_lowercase().cmp(r.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaEntry, MediaKind, ParsedMedia, ParsingResult};

    fn result(group: &str, label: &str, path: &str) -> ParsingResult {
        ParsingResult::new(
            group,
            label,
            MediaKind::Image,
            vec![MediaEntry::Image(ParsedMedia {
                path: PathBuf::from(path),
                duration: None,
                timestamp: Some(1),
                download_progress: Some(0),
            })],
        )
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        assert!(store.load(false).await.is_none());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILENAME), "{not json").unwrap();
        assert!(MetadataStore::new(dir.path()).load(false).await.is_none());
    }

    #[tokio::test]
    async fn test_force_keeps_only_manual_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let results = vec![
            ProcessedResult::manual(result("A", "mine", "/a.jpg")),
            ProcessedResult::crawled(result("B", "1", "/b.jpg")),
            ProcessedResult::crawled(result("B", "2", "/c.jpg")),
            ProcessedResult::crawled(result("B", "3", "/d.jpg")),
        ];
        store.save(&results).await.unwrap();

        let all = store.load(false).await.unwrap();
        assert_eq!(all, results);

        let forced = store.load(true).await.unwrap();
        assert_eq!(forced.len(), 1);
        assert!(forced[0].manual);
        assert_eq!(forced[0].result.label, "mine");
    }

    #[tokio::test]
    async fn test_load_tolerates_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILENAME),
            r#"[{"group":"G","label":"L","type":"image","media":[{"type":"image","path":"/x.jpg"}]}]"#,
        )
        .unwrap();
        let loaded = MetadataStore::new(dir.path()).load(false).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].result.uid, None);
        assert!(!loaded[0].manual);
    }

    #[test]
    fn test_merge_collapses_identical_entries() {
        let stored = vec![ProcessedResult::manual(result("A", "x", "/a.jpg"))];
        let fresh = vec![ProcessedResult::manual(result("A", "x", "/a.jpg"))];
        assert_eq!(merge_results(fresh, stored).len(), 1);
    }

    #[test]
    fn test_merge_uses_key_beyond_structural_equality() {
        let mut stale = ProcessedResult::crawled(result("A", "x", "/a.jpg"));
        if let Some(media) = stale.result.media[0].as_file_mut() {
            media.download_progress = Some(100);
        }
        let fresh = vec![ProcessedResult::crawled(result("A", "x", "/a.jpg"))];
        let merged = merge_results(fresh.clone(), vec![stale]);
        assert_eq!(merged, fresh);
    }

    #[test]
    fn test_merge_prefers_manual_entry_on_collision() {
        let fresh = vec![ProcessedResult::crawled(result(SONGS_GROUP, "Cântico 33", "/33.mp4"))];
        let stored = vec![ProcessedResult::manual(result(SONGS_GROUP, "Cântico 33", "/33.mp4"))];

        let merged = merge_results(fresh, stored);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].manual);
    }

    #[test]
    fn test_merge_sorts_songs_first_then_natural_order() {
        let fresh = vec![
            ProcessedResult::crawled(result("10. Estudo", "a", "/1.jpg")),
            ProcessedResult::crawled(result("2. Joias", "b", "/2.jpg")),
            ProcessedResult::crawled(result(SONGS_GROUP, "c", "/3.jpg")),
            ProcessedResult::crawled(result("A Sentinela", "d", "/4.jpg")),
        ];
        let groups: Vec<String> = merge_results(fresh, Vec::new())
            .into_iter()
            .map(|r| r.result.group)
            .collect();
        assert_eq!(groups, vec![SONGS_GROUP, "2. Joias", "10. Estudo", "A Sentinela"]);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("item 2", "item 10"), Ordering::Less);
        assert_eq!(natural_cmp("b", "A"), Ordering::Greater);
        assert_eq!(natural_cmp("abc", "ab"), Ordering::Greater);
    }
}
