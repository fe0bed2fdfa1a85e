use serde::Deserialize;
use std::path::PathBuf;

/// Default ceiling for publication video durations (20 minutes)
pub const DEFAULT_MAX_VIDEO_DURATION: f64 = 60.0 * 20.0;

/// Main configuration structure for Meeting-Media
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Local storage layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Managed storage root; every context directory lives below it
    #[serde(rename = "files-path")]
    pub files_path: PathBuf,

    /// Directory of previously obtained publication videos, checked before any download
    #[serde(rename = "library-dir")]
    pub library_dir: Option<PathBuf>,

    /// URL fragments whose downloads are also copied into `library-dir`
    #[serde(rename = "mirror-origins")]
    pub mirror_origins: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_path: std::env::temp_dir().join("meeting-media").join("files"),
            library_dir: None,
            mirror_origins: vec!["jw-cdn.org".to_string()],
        }
    }
}

/// Publication-media catalog API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Publication media links endpoint
    pub endpoint: String,

    /// Written language code sent to the catalog
    pub language: String,

    /// Videos longer than this many seconds are never downloaded
    #[serde(rename = "max-video-duration")]
    pub max_video_duration: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://b.jw-cdn.org/apis/pub-media/GETPUBMEDIALINKS".to_string(),
            language: "T".to_string(),
            max_video_duration: DEFAULT_MAX_VIDEO_DURATION,
        }
    }
}

/// Schedule site locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Weekly meetings page, with `{year}` and `{week}` placeholders
    #[serde(rename = "meetings-url")]
    pub meetings_url: String,

    /// Bible chapter page, with `{book}` and `{chapter}` placeholders
    #[serde(rename = "bible-url")]
    pub bible_url: String,

    /// Finder endpoint used to look up the year text
    #[serde(rename = "year-text-url")]
    pub year_text_url: String,

    /// Locale sent to the finder endpoint
    #[serde(rename = "year-text-locale")]
    pub year_text_locale: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            meetings_url: "https://wol.jw.org/pt/wol/meetings/r5/lp-t/{year}/{week}".to_string(),
            bible_url: "https://wol.jw.org/pt/wol/b/r5/lp-t/nwtsty/{book}/{chapter}".to_string(),
            year_text_url: "https://wol.jw.org/wol/finder".to_string(),
            year_text_locale: "t".to_string(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout for pages and catalog calls (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Longest wait for the next chunk of an asset download (seconds).
    /// Downloads have no whole-request timeout.
    #[serde(rename = "read-timeout-secs")]
    pub read_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("meeting-media/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            read_timeout_secs: 30,
        }
    }
}
