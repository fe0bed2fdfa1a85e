//! Media classification by content rather than by name

use crate::model::MediaKind;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Number of leading bytes inspected
const SNIFF_LEN: usize = 512;

/// Classifies a file by its leading bytes, defaulting to `Image`
///
/// Unreadable files are classified as `Image` as well.
pub async fn decide_file_media_type(path: &Path) -> MediaKind {
    let mut buffer = vec![0u8; SNIFF_LEN];
    let read = match tokio::fs::File::open(path).await {
        Ok(mut file) => read_prefix(&mut file, &mut buffer).await,
        Err(_) => 0,
    };
    classify_bytes(&buffer[..read])
}

async fn read_prefix(file: &mut tokio::fs::File, buffer: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buffer.len() {
        match file.read(&mut buffer[filled..]).await {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    filled
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classifies a byte prefix
pub fn classify_bytes(bytes: &[u8]) -> MediaKind {
    if let Some(kind) = classify_image(bytes) {
        return kind;
    }
    if let Some(kind) = classify_iso_media(bytes) {
        return kind;
    }
    if let Some(kind) = classify_container(bytes) {
        return kind;
    }
    if let Some(kind) = classify_audio(bytes) {
        return kind;
    }
    MediaKind::Image
}

fn classify_image(bytes: &[u8]) -> Option<MediaKind> {
    let is_image = bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
        || bytes.starts_with(b"BM")
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*");
    is_image.then_some(MediaKind::Image)
}

/// ISO base media files (`ftyp` box): mp4, mov, 3gp, m4a, avif, heic
fn classify_iso_media(bytes: &[u8]) -> Option<MediaKind> {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return None;
    }
    let brand = &bytes[8..12];
    let kind = match brand {
        b"M4A " | b"M4B " | b"M4P " | b"F4A " | b"F4B " => MediaKind::Audio,
        b"avif" | b"avis" | b"heic" | b"heix" | b"mif1" | b"msf1" => MediaKind::Image,
        _ => MediaKind::Video,
    };
    Some(kind)
}

fn classify_container(bytes: &[u8]) -> Option<MediaKind> {
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        // Matroska / WebM; audio-only WebM is rare enough to treat as video
        return Some(MediaKind::Video);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" {
        return match &bytes[8..12] {
            b"AVI " => Some(MediaKind::Video),
            b"WAVE" => Some(MediaKind::Audio),
            _ => None,
        };
    }
    if bytes.starts_with(b"OggS") {
        return if contains(bytes, b"theora") {
            Some(MediaKind::Video)
        } else {
            Some(MediaKind::Audio)
        };
    }
    if bytes.starts_with(b"FLV") || bytes.starts_with(&[0x00, 0x00, 0x01, 0xBA]) || bytes.starts_with(&[0x00, 0x00, 0x01, 0xB3]) {
        return Some(MediaKind::Video);
    }
    None
}

fn classify_audio(bytes: &[u8]) -> Option<MediaKind> {
    let is_audio = bytes.starts_with(b"ID3")
        || bytes.starts_with(b"fLaC")
        || bytes.starts_with(b"MThd")
        || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0);
    is_audio.then_some(MediaKind::Audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_images() {
        assert_eq!(classify_bytes(b"\x89PNG\r\n\x1a\n...."), MediaKind::Image);
        assert_eq!(classify_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), MediaKind::Image);
        assert_eq!(classify_bytes(b"RIFF\0\0\0\0WEBPVP8 "), MediaKind::Image);
    }

    #[test]
    fn test_classify_mp4_as_video() {
        assert_eq!(classify_bytes(b"\0\0\0\x20ftypisom\0\0\x02\0"), MediaKind::Video);
        assert_eq!(classify_bytes(b"\0\0\0\x18ftypmp42\0\0\0\0"), MediaKind::Video);
    }

    #[test]
    fn test_classify_m4a_as_audio() {
        assert_eq!(classify_bytes(b"\0\0\0\x20ftypM4A \0\0\0\0"), MediaKind::Audio);
    }

    #[test]
    fn test_classify_audio() {
        assert_eq!(classify_bytes(b"ID3\x04\0\0\0\0"), MediaKind::Audio);
        assert_eq!(classify_bytes(&[0xFF, 0xFB, 0x90, 0x64]), MediaKind::Audio);
        assert_eq!(classify_bytes(b"RIFF\0\0\0\0WAVEfmt "), MediaKind::Audio);
    }

    #[test]
    fn test_classify_containers() {
        assert_eq!(classify_bytes(&[0x1A, 0x45, 0xDF, 0xA3, 0x01]), MediaKind::Video);
        assert_eq!(classify_bytes(b"OggS\0\x02....\x80theora"), MediaKind::Video);
        assert_eq!(classify_bytes(b"OggS\0\x02....OpusHead"), MediaKind::Audio);
    }

    #[test]
    fn test_inconclusive_defaults_to_image() {
        assert_eq!(classify_bytes(b"hello world"), MediaKind::Image);
        assert_eq!(classify_bytes(&[]), MediaKind::Image);
    }

    #[tokio::test]
    async fn test_decide_from_file_content_not_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("looks-like-image.jpg");
        std::fs::write(&path, b"\0\0\0\x20ftypisom\0\0\x02\0rest").unwrap();
        assert_eq!(decide_file_media_type(&path).await, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_missing_file_defaults_to_image() {
        assert_eq!(
            decide_file_media_type(Path::new("/definitely/not/here")).await,
            MediaKind::Image
        );
    }
}
