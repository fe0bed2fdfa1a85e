//! Publication and playlist packages
//!
//! Users may upload zipped packages instead of plain media files:
//!
//! - A `.jwpub` publication holds a nested `contents` archive with embedded
//!   media and an SQLite index. Index rows with a key symbol refer to videos
//!   that must be resolved through the catalog instead.
//! - A `.jwlplaylist` playlist holds media files and a `userData.db` index
//!   that orders and labels them.
//!
//! Extraction is blocking (zip and SQLite) and runs on the blocking pool.

mod jwpub;
mod playlist;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use jwpub::extract_publication;
pub use playlist::extract_playlist;

/// Errors raised while unpacking a package
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Missing entry '{0}' in package")]
    MissingEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for package extraction
pub type PackageResult<T> = Result<T, PackageError>;

/// Kind of package, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Publication,
    Playlist,
}

impl PackageKind {
    /// `None` for anything that is not a package
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "jwpub" => Some(Self::Publication),
            "jwlplaylist" => Some(Self::Playlist),
            _ => None,
        }
    }
}

/// One media item found in a package
#[derive(Debug, Clone, PartialEq)]
pub enum PackageItem {
    /// Embedded file written to the extraction directory
    File { path: PathBuf, label: String },
    /// Video referenced by publication key symbol and track
    Reference { key_symbol: String, track: u32 },
}

/// Unpacks `source` into `dir`, which must exist
pub async fn extract(kind: PackageKind, source: &Path, dir: &Path) -> PackageResult<Vec<PackageItem>> {
    let source = source.to_path_buf();
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || match kind {
        PackageKind::Publication => extract_publication(&source, &dir),
        PackageKind::Playlist => extract_playlist(&source, &dir),
    })
    .await
    .map_err(|e| PackageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Last path component of an archive entry name
fn entry_basename(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

/// Copies the entry `name` of `archive` to `dir`, keeping only its basename
fn write_entry<R: std::io::Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    dir: &Path,
) -> PackageResult<Option<PathBuf>> {
    let Some(basename) = entry_basename(name) else {
        return Ok(None);
    };
    let mut entry = archive.by_name(name)?;
    if entry.is_dir() {
        return Ok(None);
    }
    let target = dir.join(basename);
    let mut file = std::fs::File::create(&target)?;
    std::io::copy(&mut entry, &mut file)?;
    Ok(Some(target))
}

/// Opens a database held in memory by writing it next to the extracted media
///
/// The temporary file is removed before returning.
fn with_database<T>(
    bytes: &[u8],
    dir: &Path,
    name: &str,
    query: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
) -> PackageResult<T> {
    let path = dir.join(format!(".{}.db", name));
    std::fs::write(&path, bytes)?;
    let result = rusqlite::Connection::open_with_flags(&path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        .and_then(|conn| query(&conn));
    let _ = std::fs::remove_file(&path);
    Ok(result?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(PackageKind::from_path(Path::new("/x/a.JWPUB")), Some(PackageKind::Publication));
        assert_eq!(PackageKind::from_path(Path::new("a.jwlplaylist")), Some(PackageKind::Playlist));
        assert_eq!(PackageKind::from_path(Path::new("a.mp4")), None);
        assert_eq!(PackageKind::from_path(Path::new("jwpub")), None);
    }

    #[test]
    fn test_entry_basename_drops_directories() {
        assert_eq!(entry_basename("../../etc/x.jpg").as_deref(), Some("x.jpg"));
        assert_eq!(entry_basename("img/").as_deref(), Some("img"));
        assert_eq!(entry_basename(""), None);
    }
}
