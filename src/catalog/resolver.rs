use super::api::{best_rendition, CatalogResponse, CatalogUrlBuilder, Rendition};
use super::reference::PublicationRef;
use super::{CatalogError, CatalogResult, BIBLE_PUBLICATION, SONG_PUBLICATION};
use crate::config::CatalogConfig;
use crate::model::VerseMarker;
use crate::store::AssetStore;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use url::Url;

/// Song renditions carrying this marker duplicate a regular track
const AUDIO_DESCRIPTION_MARKER: &str = "(com audiodescrição)";

/// A publication video accepted by the resolver and queued for download
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVideo {
    /// Final location once the store is flushed
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub title: String,
    /// Length in seconds
    pub duration: f64,
}

/// Chapter audio for a Bible reading
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterAudio {
    pub url: String,
    pub duration: f64,
    pub markers: Vec<VerseMarker>,
}

/// Resolves reference handles against the publication catalog
#[derive(Debug, Clone)]
pub struct PublicationResolver {
    client: Client,
    config: CatalogConfig,
}

impl PublicationResolver {
    pub fn new(client: Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// A URL builder preset with the configured endpoint and language
    pub fn url_builder(&self) -> CatalogUrlBuilder {
        CatalogUrlBuilder::new(&self.config.endpoint, &self.config.language)
    }

    /// Resolves `handle` and queues the chosen rendition on `store`
    ///
    /// Every failure is logged and turned into `None`: missing parameters,
    /// an unreachable or malformed catalog, no usable rendition, and videos
    /// longer than the configured ceiling. A rejected video is never queued.
    ///
    /// # Arguments
    ///
    /// * `handle` - Reference handle or any link carrying `pub`/`docid`, `track` and `issue`
    /// * `store` - Asset store bound to the target context
    pub async fn resolve(&self, handle: &str, store: &AssetStore) -> Option<ResolvedVideo> {
        match self.try_resolve(handle, store).await {
            Ok(video) => Some(video),
            Err(CatalogError::DurationExceeded { title, duration, max }) => {
                warn!(
                    "Skipping '{}': {}s is longer than the {}s limit",
                    title, duration, max
                );
                None
            }
            Err(CatalogError::MissingParameters(reference)) => {
                error!("Invalid publication reference: {}", reference);
                None
            }
            Err(e) => {
                error!("Could not resolve {}: {}", handle, e);
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but reports why resolution failed
    pub async fn try_resolve(&self, handle: &str, store: &AssetStore) -> CatalogResult<ResolvedVideo> {
        let rendition = self.lookup_video(handle).await?;
        let duration = rendition.duration.unwrap_or(0.0);

        let asset = store.enqueue_download(&rendition.file.url, "mp4").await?;
        info!("Queued '{}' ({}s) from {}", rendition.title, duration, rendition.file.url);

        Ok(ResolvedVideo {
            path: asset.path,
            thumbnail: asset.thumbnail,
            title: rendition.title,
            duration,
        })
    }

    /// Picks the best video rendition for `handle` without queuing anything
    pub async fn lookup_video(&self, handle: &str) -> CatalogResult<Rendition> {
        let reference = PublicationRef::parse(handle);
        reference.validate()?;

        let mut builder = self.url_builder().file_format("mp4");
        if let Some(pub_code) = &reference.pub_code {
            builder = builder.pub_code(pub_code);
        }
        if let Some(docid) = &reference.docid {
            builder = builder.docid(docid);
        }
        if let Some(track) = &reference.track {
            builder = builder.track(track);
        }
        if let Some(issue) = &reference.issue {
            builder = builder.issue(issue);
        }

        let response = self.query(builder.build()?).await?;
        let rendition = best_rendition(response.renditions(&self.config.language, "mp4"))
            .filter(|r| !r.file.url.is_empty())
            .cloned()
            .ok_or_else(|| CatalogError::NoRendition(reference.to_handle()))?;

        let duration = rendition.duration.unwrap_or(0.0);
        if duration > self.config.max_video_duration {
            return Err(CatalogError::DurationExceeded {
                title: rendition.title,
                duration,
                max: self.config.max_video_duration,
            });
        }

        Ok(rendition)
    }

    /// Chapter audio with the markers of the requested verses
    pub async fn chapter_audio(
        &self,
        booknum: u32,
        chapter: u32,
        verses: &[u32],
    ) -> CatalogResult<ChapterAudio> {
        let url = self
            .url_builder()
            .pub_code(BIBLE_PUBLICATION)
            .file_format("mp3")
            .booknum(booknum)
            .track(chapter)
            .build()?;

        let response = self.query(url).await?;
        let rendition = response
            .renditions(&self.config.language, "mp3")
            .first()
            .ok_or_else(|| CatalogError::NoRendition(format!("{} {}:{}", BIBLE_PUBLICATION, booknum, chapter)))?;

        let markers = rendition
            .markers
            .iter()
            .flat_map(|set| set.markers.iter())
            .filter_map(|marker| {
                let verse_number = marker.verse_number?;
                verses.contains(&verse_number).then(|| VerseMarker {
                    verse_number,
                    start_time: marker.start_time.clone(),
                    duration: marker.duration.clone(),
                })
            })
            .collect();

        Ok(ChapterAudio {
            url: rendition.file.url.clone(),
            duration: rendition.duration.unwrap_or(0.0),
            markers,
        })
    }

    /// Highest song track number, ignoring audio-described duplicates
    pub async fn song_count(&self) -> CatalogResult<u32> {
        let url = self.url_builder().pub_code(SONG_PUBLICATION).file_format("mp3").build()?;
        let response = self.query(url).await?;

        Ok(response
            .renditions(&self.config.language, "mp3")
            .iter()
            .filter(|r| !r.title.to_lowercase().contains(AUDIO_DESCRIPTION_MARKER))
            .filter_map(|r| r.track)
            .max()
            .unwrap_or(0))
    }

    async fn query(&self, url: Url) -> CatalogResult<CatalogResponse> {
        debug!("Querying catalog: {}", url);
        let url_str = url.to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| CatalogError::Http {
            url: url_str.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Decode {
            url: url_str,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::generate_reference_url;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer, max_video_duration: f64) -> PublicationResolver {
        PublicationResolver::new(
            Client::new(),
            CatalogConfig {
                endpoint: format!("{}/links", server.uri()),
                language: "T".to_string(),
                max_video_duration,
            },
        )
    }

    fn store(root: &std::path::Path) -> AssetStore {
        let mut store = AssetStore::new(root, Client::new());
        store.set_context("2024-20--1");
        store
    }

    fn video(label: &str, duration: f64) -> serde_json::Value {
        json!({
            "title": "Song 5",
            "label": label,
            "duration": duration,
            "file": { "url": format!("https://cdn.test/media/sjjm_T_005_r{}.mp4", label) }
        })
    }

    #[tokio::test]
    async fn test_resolve_picks_highest_rendition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .and(query_param("pub", "sjjm"))
            .and(query_param("track", "5"))
            .and(query_param("fileformat", "mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": { "T": { "MP4": [
                    video("240p", 200.0), video("720p", 200.0), video("480p", 200.0)
                ] } }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolved = resolver(&server, 1200.0)
            .resolve(&generate_reference_url("sjjm", 5, None), &store)
            .await
            .expect("video should resolve");

        assert!(resolved.path.ends_with("sjjm_T_005_r720p.mp4"));
        assert!(resolved.thumbnail.is_some());
        assert_eq!(resolved.title, "Song 5");
        assert_eq!(resolved.duration, 200.0);
        assert_eq!(store.pending().downloads, 1);
    }

    #[tokio::test]
    async fn test_resolve_rejects_long_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": { "T": { "MP4": [video("720p", 1500.0)] } }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolved = resolver(&server, 1200.0)
            .resolve("webpubvid://?pub=sjjm&track=5", &store)
            .await;

        assert!(resolved.is_none());
        assert_eq!(store.pending().downloads, 0);
    }

    #[tokio::test]
    async fn test_resolve_missing_parameters_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server, 1200.0);

        assert!(resolver.resolve("webpubvid://?pub=sjjm", &store).await.is_none());
        assert!(resolver.resolve("webpubvid://?track=1", &store).await.is_none());
        assert_eq!(store.pending().downloads, 0);
    }

    #[tokio::test]
    async fn test_resolve_without_renditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": {} })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let result = resolver(&server, 1200.0)
            .try_resolve("webpubvid://?docid=1102024&track=1", &store)
            .await;
        assert!(matches!(result, Err(CatalogError::NoRendition(_))));
    }

    #[tokio::test]
    async fn test_resolve_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let result = resolver(&server, 1200.0)
            .try_resolve("webpubvid://?pub=sjjm&track=1", &store)
            .await;
        assert!(matches!(result, Err(CatalogError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_chapter_audio_filters_markers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .and(query_param("pub", "nwt"))
            .and(query_param("booknum", "19"))
            .and(query_param("track", "23"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": { "T": { "MP3": [{
                    "title": "Salmo 23",
                    "duration": 95.5,
                    "file": { "url": "https://cdn.test/nwt_19_Ps_T_023.mp3" },
                    "markers": { "markers": [
                        { "verseNumber": 1, "startTime": "0:00:05.000", "duration": "0:00:08.000" },
                        { "verseNumber": 2, "startTime": "0:00:13.000", "duration": "0:00:07.000" },
                        { "verseNumber": 4, "startTime": "0:00:30.000", "duration": "0:00:09.000" }
                    ] }
                }] } }
            })))
            .mount(&server)
            .await;

        let audio = resolver(&server, 1200.0)
            .chapter_audio(19, 23, &[1, 4])
            .await
            .unwrap();
        assert_eq!(audio.url, "https://cdn.test/nwt_19_Ps_T_023.mp3");
        assert_eq!(audio.duration, 95.5);
        let verses: Vec<u32> = audio.markers.iter().map(|m| m.verse_number).collect();
        assert_eq!(verses, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_song_count_ignores_audio_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/links"))
            .and(query_param("pub", "sjjm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": { "T": { "MP3": [
                    { "title": "1. Song", "track": 1 },
                    { "title": "151. Song", "track": 151 },
                    { "title": "Extra (com audiodescrição)", "track": 170 }
                ] } }
            })))
            .mount(&server)
            .await;

        assert_eq!(resolver(&server, 1200.0).song_count().await.unwrap(), 151);
    }
}
