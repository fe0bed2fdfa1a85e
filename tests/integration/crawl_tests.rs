//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to serve pages, catalog responses and media
//! files, and run crawls, flushes and merges end-to-end.

use meeting_media::catalog::PublicationResolver;
use meeting_media::config::{CatalogConfig, Config};
use meeting_media::crawler::{CrawlDispatcher, CrawlerUtils};
use meeting_media::metadata::{merge_results, MetadataStore};
use meeting_media::ops::MediaService;
use meeting_media::parsers::{ArticleMediaParser, SONGS_GROUP, WATCHTOWER_GROUP};
use meeting_media::probe::NoopProbe;
use meeting_media::store::{AssetStore, CollectingProgress};
use meeting_media::{MediaEntry, MediaKind, ParsingResult, ProcessedResult, WeekType};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MP4_BYTES: &[u8] = b"\0\0\0\x20ftypisom\0\0\x02\0payload";
const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn test_store(root: &Path, progress: Arc<CollectingProgress>) -> AssetStore {
    let mut store = AssetStore::new(root, Client::new())
        .with_probe(Arc::new(NoopProbe))
        .with_progress(progress);
    store.set_context("2024-20--1");
    store
}

fn test_resolver(server: &MockServer, max_video_duration: f64) -> PublicationResolver {
    PublicationResolver::new(
        Client::new(),
        CatalogConfig {
            endpoint: format!("{}/links", server.uri()),
            max_video_duration,
            ..CatalogConfig::default()
        },
    )
}

/// Serves a catalog entry for `pub_code`/`track` and the video file itself
async fn mount_video(server: &MockServer, pub_code: &str, track: &str, title: &str, duration: f64) {
    let file = format!("/files/{}_T_{}_r720P.mp4", pub_code, track);
    Mock::given(method("GET"))
        .and(path("/links"))
        .and(query_param("pub", pub_code))
        .and(query_param("track", track))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": { "T": { "MP4": [
                { "title": title, "label": "240p", "duration": duration,
                  "file": { "url": format!("{}/files/{}_T_{}_r240P.mp4", server.uri(), pub_code, track) } },
                { "title": title, "label": "720p", "duration": duration,
                  "file": { "url": format!("{}{}", server.uri(), file) } },
                { "title": title, "label": "480p", "duration": duration,
                  "file": { "url": format!("{}/files/{}_T_{}_r480P.mp4", server.uri(), pub_code, track) } }
            ] } }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(file))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MP4_BYTES))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, image: &str) {
    Mock::given(method("GET"))
        .and(path(image))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
        .mount(server)
        .await;
}

const ARTICLE: &str = r#"<html><head><title>Artigo — Biblioteca</title></head><body>
    <div id="article">
        <h1>Seja corajoso</h1>
        <p><img src="/img/x.jpg" alt="Um homem lendo"></p>
        <p><a data-video="webpubvid://?pub=mwbv&amp;track=1">Assista ao vídeo</a></p>
    </div>
</body></html>"#;

#[tokio::test]
async fn test_article_page_end_to_end() {
    let server = MockServer::start().await;
    mount_page(&server, "/article", ARTICLE).await;
    mount_image(&server, "/img/x.jpg").await;
    mount_video(&server, "mwbv", "1", "Seja corajoso", 95.0).await;

    let dir = TempDir::new().unwrap();
    let progress = Arc::new(CollectingProgress::new());
    let store = test_store(dir.path(), progress.clone());
    let resolver = test_resolver(&server, 1200.0);
    let client = Client::new();

    let results = CrawlDispatcher::new(format!("{}/article", server.uri()), CrawlerUtils::new(&client, &store, &resolver))
        .add_parser(ArticleMediaParser::default())
        .process()
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.result.group == "Seja corajoso"));
    assert!(results.iter().all(|r| !r.manual));

    let image = results.iter().find(|r| r.result.kind == MediaKind::Image).unwrap();
    assert_eq!(image.result.media.len(), 1);
    let image_path = image.result.media[0].path().unwrap().to_path_buf();
    assert!(image_path.to_string_lossy().ends_with(".jpg"));

    let video = results.iter().find(|r| r.result.kind == MediaKind::Video).unwrap();
    assert_eq!(video.result.label, "Seja corajoso");
    let kinds: Vec<MediaKind> = video.result.media.iter().map(MediaEntry::kind).collect();
    assert_eq!(kinds, vec![MediaKind::Video, MediaKind::Image]);
    let video_path = video.result.media[0].path().unwrap().to_path_buf();
    let thumbnail_path = video.result.media[1].path().unwrap().to_path_buf();
    assert!(video_path.ends_with("mwbv_T_1_r720P.mp4"));

    // Nothing touches the disk before the flush
    assert!(!image_path.exists());
    assert_eq!(store.pending().downloads, 2);

    assert_eq!(store.flush().await, 2);
    assert_eq!(store.pending().total(), 0);

    assert!(image_path.exists());
    assert!(video_path.exists());
    assert!(thumbnail_path.exists());
    assert_eq!(progress.last_percent("x.jpg"), Some(100));
    assert_eq!(progress.last_percent("mwbv_T_1_r720P.mp4"), Some(100));
}

#[tokio::test]
async fn test_duplicate_page_in_session_is_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/article", ARTICLE).await;
    mount_video(&server, "mwbv", "1", "Seja corajoso", 95.0).await;

    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path(), Arc::new(CollectingProgress::new()));
    let resolver = test_resolver(&server, 1200.0);
    let client = Client::new();
    let utils = CrawlerUtils::new(&client, &store, &resolver);
    let url = format!("{}/article", server.uri());

    let first = CrawlDispatcher::new(url.as_str(), utils.clone())
        .add_parser(ArticleMediaParser::default())
        .process()
        .await
        .unwrap();
    let second = CrawlDispatcher::new(url.as_str(), utils.clone())
        .add_parser(ArticleMediaParser::default())
        .process()
        .await
        .unwrap();
    let isolated = CrawlDispatcher::new(url.as_str(), utils.isolated())
        .add_parser(ArticleMediaParser::default())
        .process()
        .await
        .unwrap();

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
    assert_eq!(isolated.len(), 2);
    assert_eq!(utils.visited().len(), 1);
}

#[tokio::test]
async fn test_long_video_is_not_queued() {
    let server = MockServer::start().await;
    mount_video(&server, "mwbv", "7", "Reunião completa", 5400.0).await;

    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path(), Arc::new(CollectingProgress::new()));
    let resolver = test_resolver(&server, 1200.0);

    let handle = "webpubvid://?pub=mwbv&track=7";
    assert!(resolver.resolve(handle, &store).await.is_none());
    assert_eq!(store.pending().total(), 0);
}

#[test]
fn test_delete_outside_storage_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = test_store(dir.path(), Arc::new(CollectingProgress::new()));

    assert!(store.enqueue_delete("../../outside.txt").is_err());
    assert!(store.enqueue_delete("..").is_err());
    assert_eq!(store.pending().deletes, 0);

    assert!(store.enqueue_delete("video.mp4").is_ok());
    assert!(store.enqueue_delete("video.mp4").is_ok());
    assert_eq!(store.pending().deletes, 1);
}

fn entry(group: &str, label: &str, file: &str, manual: bool) -> ProcessedResult {
    let result = ParsingResult::new(
        group,
        label,
        MediaKind::Image,
        vec![MediaEntry::Image(meeting_media::ParsedMedia::complete(format!("/files/{}", file)))],
    );
    if manual {
        ProcessedResult::manual(result)
    } else {
        ProcessedResult::crawled(result)
    }
}

#[tokio::test]
async fn test_forced_reload_keeps_only_manual_entries() {
    let dir = TempDir::new().unwrap();
    let metadata = MetadataStore::new(dir.path());
    let stored = vec![
        entry("Parte 1", "Foto", "a.jpg", false),
        entry("Parte 2", "Foto", "b.jpg", true),
        entry("Parte 3", "Foto", "c.jpg", false),
        entry("Parte 4", "Foto", "d.jpg", false),
    ];
    metadata.save(&stored).await.unwrap();

    assert_eq!(metadata.load(false).await.unwrap().len(), 4);
    assert_eq!(metadata.load(true).await.unwrap(), vec![stored[1].clone()]);
}

#[test]
fn test_merge_collapses_identical_entries() {
    let manual = entry("A", "Foto", "a.jpg", true);
    let mut fresh = manual.clone();
    fresh.manual = false;

    let merged = merge_results(vec![fresh], vec![manual]);
    assert_eq!(merged.len(), 1);

    let merged = merge_results(
        vec![entry("10. Estudo", "x", "x.jpg", false), entry(SONGS_GROUP, "y", "y.jpg", false)],
        vec![entry("2. Vida", "z", "z.jpg", true)],
    );
    let groups: Vec<&str> = merged.iter().map(|r| r.result.group.as_str()).collect();
    assert_eq!(groups, vec![SONGS_GROUP, "2. Vida", "10. Estudo"]);
}

#[tokio::test]
async fn test_fetch_weekend_media() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/meetings/2024/20",
        r#"<html><body>
            <div class="todayItem pub-w"><h3><a class="pub-w" href="/study">Seja corajoso como Josué</a></h3></div>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/study",
        r#"<html><body><div id="article"><h1>Estudo</h1>
            <p><a href="/songs/12">CÂNTICO 12</a></p>
            <figure><img src="/img/study.jpg"><figcaption>Josué lidera o povo</figcaption></figure>
        </div></body></html>"#,
    )
    .await;
    mount_image(&server, "/img/study.jpg").await;
    mount_video(&server, "sjjm", "12", "12. Grande Criador", 180.0).await;

    let mut config = Config::default();
    config.storage.files_path = dir.path().to_path_buf();
    config.catalog.endpoint = format!("{}/links", server.uri());
    config.site.meetings_url = format!("{}/meetings/{{year}}/{{week}}", server.uri());
    let progress = Arc::new(CollectingProgress::new());
    let service = MediaService::new(config)
        .unwrap()
        .with_probe(Arc::new(NoopProbe))
        .with_progress(progress.clone());

    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
    let results = service.fetch_week_media(date, WeekType::Weekend, false).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].result.group, SONGS_GROUP);
    assert_eq!(results[0].result.label, "Cântico 12 - Grande Criador");
    assert_eq!(
        results[1].result.group,
        format!("{} :: Seja corajoso como Josué", WATCHTOWER_GROUP)
    );
    assert_eq!(results[1].result.label, "Josué lidera o povo");

    let context = dir.path().join("2024-20--2");
    assert!(context.join("study.jpg").exists());
    assert!(context.join("sjjm_T_12_r720P.mp4").exists());
    assert_eq!(progress.last_percent("study.jpg"), Some(100));

    // A second call is served from the stored metadata
    let cached = service.fetch_week_media(date, WeekType::Weekend, false).await.unwrap();
    assert_eq!(cached, results);
}
