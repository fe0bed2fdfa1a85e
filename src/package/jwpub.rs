use super::{entry_basename, with_database, write_entry, PackageError, PackageItem, PackageResult};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Nested archive holding a publication's media and index
const CONTENTS_ENTRY: &str = "contents";

/// Names of the archive's entries, in archive order
fn entry_names<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> PackageResult<Vec<String>> {
    (0..archive.len())
        .map(|i| Ok(archive.by_index(i)?.name().to_string()))
        .collect()
}

/// Indexed videos of a publication database, skipping embedded files
fn referenced_videos(conn: &rusqlite::Connection, embedded: &[String]) -> rusqlite::Result<Vec<PackageItem>> {
    let mut stmt = conn.prepare(
        "SELECT KeySymbol, Track, FilePath
         FROM Multimedia
         WHERE KeySymbol IS NOT NULL
         ORDER BY MultimediaId",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<i64>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut items = Vec::new();
    for row in rows {
        let (key_symbol, track, file_path) = row?;
        if file_path.is_some_and(|path| embedded.contains(&path)) {
            continue;
        }
        let track = track.and_then(|t| u32::try_from(t).ok()).unwrap_or(1);
        items.push(PackageItem::Reference { key_symbol, track });
    }
    Ok(items)
}

/// Unpacks a `.jwpub` publication into `dir`
///
/// Embedded media comes first, in archive order, labelled by file name.
/// Videos listed in the publication's index follow as references.
pub fn extract_publication(source: &Path, dir: &Path) -> PackageResult<Vec<PackageItem>> {
    let mut outer = ZipArchive::new(File::open(source)?)?;
    let mut contents = Vec::new();
    match outer.by_name(CONTENTS_ENTRY) {
        Ok(mut entry) => entry.read_to_end(&mut contents)?,
        Err(ZipError::FileNotFound) => return Err(PackageError::MissingEntry(CONTENTS_ENTRY.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut inner = ZipArchive::new(Cursor::new(contents))?;

    let (databases, media): (Vec<String>, Vec<String>) = entry_names(&mut inner)?
        .into_iter()
        .partition(|name| name.ends_with(".db"));

    let mut items = Vec::new();
    let mut embedded = Vec::new();
    for name in &media {
        if let Some(path) = write_entry(&mut inner, name, dir)? {
            let label = entry_basename(name).unwrap_or_default();
            embedded.push(label.clone());
            items.push(PackageItem::File { path, label });
        }
    }

    for name in &databases {
        let mut bytes = Vec::new();
        inner.by_name(name)?.read_to_end(&mut bytes)?;
        let stem = entry_basename(name).unwrap_or_default();
        let references = with_database(&bytes, dir, &stem, |conn| referenced_videos(conn, &embedded))?;
        debug!("{} videos referenced by {}", references.len(), name);
        items.extend(references);
    }

    Ok(items)
}
