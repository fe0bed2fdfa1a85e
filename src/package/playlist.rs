use super::{entry_basename, with_database, write_entry, PackageError, PackageItem, PackageResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Index of a playlist package
const PLAYLIST_DATABASE: &str = "userData.db";

/// Media extensions taken from a playlist without an index
const MEDIA_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "mp4", "ogg", "opus", "mp3"];

/// Playlist items as (label, file path), in playlist order
fn playlist_items(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<(Option<String>, String)>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT
            pl.PlaylistItemId,
            pl.Label,
            im.FilePath
         FROM IndependentMedia im
            INNER JOIN PlaylistItemIndependentMediaMap map ON im.IndependentMediaId = map.IndependentMediaId
            INNER JOIN PlaylistItem pl ON map.PlaylistItemId = pl.PlaylistItemId
            INNER JOIN TagMap tag ON pl.PlaylistItemId = tag.PlaylistItemId
         ORDER BY tag.Position ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?;
    rows.collect()
}

fn is_loose_media(name: &str) -> bool {
    let lower = name.to_lowercase();
    !lower.contains("default_thumbnail")
        && Path::new(&lower)
            .extension()
            .map_or(false, |ext| MEDIA_EXTENSIONS.iter().any(|m| ext == *m))
}

/// Unpacks a `.jwlplaylist` playlist into `dir`
///
/// With a `userData.db` index, items follow the playlist order and carry
/// their playlist labels. Without one, every media file of the archive is
/// taken, labelled by file name.
pub fn extract_playlist(source: &Path, dir: &Path) -> PackageResult<Vec<PackageItem>> {
    let mut archive = ZipArchive::new(File::open(source)?)?;

    let mut database = Vec::new();
    let indexed = match archive.by_name(PLAYLIST_DATABASE) {
        Ok(mut entry) => {
            entry.read_to_end(&mut database)?;
            true
        }
        Err(ZipError::FileNotFound) => false,
        Err(e) => return Err(e.into()),
    };

    let entries: Vec<(Option<String>, String)> = if indexed {
        with_database(&database, dir, PLAYLIST_DATABASE, playlist_items)?
    } else {
        (0..archive.len())
            .map(|i| Ok(archive.by_index(i)?.name().to_string()))
            .collect::<PackageResult<Vec<String>>>()?
            .into_iter()
            .filter(|name| is_loose_media(name))
            .map(|name| (None, name))
            .collect()
    };

    let mut items = Vec::new();
    for (label, name) in entries {
        let path = match write_entry(&mut archive, &name, dir) {
            Ok(Some(path)) => path,
            Ok(None) => continue,
            Err(PackageError::Zip(ZipError::FileNotFound)) => {
                error!("Could not load file from playlist: {}", name);
                continue;
            }
            Err(e) => return Err(e),
        };
        let label = label
            .filter(|l| !l.trim().is_empty())
            .or_else(|| entry_basename(&name))
            .unwrap_or_default();
        items.push(PackageItem::File { path, label });
    }
    Ok(items)
}
