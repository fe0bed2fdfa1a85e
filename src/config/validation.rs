use crate::config::types::{CatalogConfig, Config, HttpConfig, SiteConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_catalog_config(&config.catalog)?;
    validate_site_config(&config.site)?;
    validate_http_config(&config.http)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.files_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "files-path cannot be empty".to_string(),
        ));
    }

    if let Some(library) = &config.library_dir {
        if library.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "library-dir cannot be empty when set".to_string(),
            ));
        }
    }

    if config.mirror_origins.iter().any(|o| o.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "mirror-origins cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_http_url("catalog endpoint", &config.endpoint)?;

    if config.language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "catalog language cannot be empty".to_string(),
        ));
    }

    if !(config.max_video_duration > 0.0) {
        return Err(ConfigError::Validation(format!(
            "max-video-duration must be positive, got {}",
            config.max_video_duration
        )));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    for placeholder in ["{year}", "{week}"] {
        if !config.meetings_url.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "meetings-url must contain the {} placeholder",
                placeholder
            )));
        }
    }

    let sample = config
        .meetings_url
        .replace("{year}", "2024")
        .replace("{week}", "1");
    validate_http_url("meetings-url", &sample)?;

    for placeholder in ["{book}", "{chapter}"] {
        if !config.bible_url.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "bible-url must contain the {} placeholder",
                placeholder
            )));
        }
    }
    let sample = config
        .bible_url
        .replace("{book}", "1")
        .replace("{chapter}", "1");
    validate_http_url("bible-url", &sample)?;
    validate_http_url("year-text-url", &config.year_text_url)?;

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.read_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "read-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that `value` parses as an HTTP(S) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use HTTP or HTTPS, got '{}'",
            name, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut config = Config::default();
        config.catalog.max_video_duration = 0.0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_nan_duration_rejected() {
        let mut config = Config::default();
        config.catalog.max_video_duration = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let mut config = Config::default();
        config.site.meetings_url = "https://example.com/meetings/{year}".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.catalog.endpoint = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.catalog.endpoint = "ftp://example.com/links".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_read_timeout_rejected() {
        let mut config = Config::default();
        config.http.read_timeout_secs = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_files_path_rejected() {
        let mut config = Config::default();
        config.storage.files_path = std::path::PathBuf::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_mirror_origin_rejected() {
        let mut config = Config::default();
        config.storage.mirror_origins.push("  ".to_string());
        assert!(validate(&config).is_err());
    }
}
