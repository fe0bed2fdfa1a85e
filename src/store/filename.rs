//! Deterministic, filesystem-safe target names for untrusted inputs

use crate::probe::is_video_file;
use std::path::{Path, PathBuf};
use url::Url;

/// Suffix replacing a video's extension to form its thumbnail filename
pub const THUMBNAIL_SUFFIX: &str = "-thumb.png";

/// Folds a character onto the ASCII range, or drops it
fn transliterate(c: char, out: &mut String) {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' => "I",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' => "U",
        'ç' => "c",
        'Ç' => "C",
        'ñ' => "n",
        'Ñ' => "N",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        '–' | '—' => "-",
        c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => {
            out.push(c);
            return;
        }
        _ => "",
    };
    out.push_str(folded);
}

/// Sanitizes an untrusted filename
///
/// Characters are transliterated to ASCII, whitespace runs become a single
/// hyphen, anything outside `[A-Za-z0-9._-]` is dropped and leading dots
/// or hyphens are stripped so the result can never name a parent or hidden
/// entry. Returns `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use meeting_media::store::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Cântico  12 (áudio).mp3").as_deref(), Some("Cantico-12-audio.mp3"));
/// assert_eq!(sanitize_filename("../.."), None);
/// ```
pub fn sanitize_filename(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_whitespace() {
            pending_hyphen = !out.is_empty();
            continue;
        }
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        transliterate(c, &mut out);
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_start_matches(['.', '-']).trim_end_matches('-');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Last path segment of a URL, without query or fragment
pub fn filename_from_url(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };
    segment.filter(|s| !s.is_empty())
}

/// Appends `.{extension}` unless the name already ends with it
pub fn with_extension(mut filename: String, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        return filename;
    }
    let suffix = format!(".{}", extension);
    if !filename.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()) {
        filename.push_str(&suffix);
    }
    filename
}

/// Thumbnail location for a video target, `None` for other media
pub fn thumbnail_path(target: &Path) -> Option<PathBuf> {
    if !is_video_file(target) {
        return None;
    }
    let stem = target.file_stem()?.to_string_lossy();
    Some(target.with_file_name(format!("{}{}", stem, THUMBNAIL_SUFFIX)))
}
