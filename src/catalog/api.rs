use super::{CatalogError, CatalogResult, BIBLE_PUBLICATION};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Query builder for the publication media links endpoint
#[derive(Debug, Clone)]
pub struct CatalogUrlBuilder {
    endpoint: String,
    params: Vec<(&'static str, String)>,
}

impl CatalogUrlBuilder {
    pub fn new(endpoint: impl Into<String>, language: &str) -> Self {
        let mut builder = Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        };
        builder.set("alllangs", "0");
        builder.set("txtCMSLang", language);
        builder.set("langwritten", language);
        builder.set("output", "json");
        builder
    }

    fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    fn has(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| *k == key)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pub_code(mut self, pub_code: &str) -> Self {
        self.set("pub", pub_code);
        self
    }

    pub fn docid(mut self, docid: &str) -> Self {
        self.set("docid", docid);
        self
    }

    pub fn track(mut self, track: impl ToString) -> Self {
        self.set("track", track.to_string());
        self
    }

    pub fn issue(mut self, issue: &str) -> Self {
        self.set("issue", issue);
        self
    }

    pub fn booknum(mut self, booknum: u32) -> Self {
        self.set("booknum", booknum.to_string());
        self
    }

    pub fn file_format(mut self, format: &str) -> Self {
        self.set("fileformat", format);
        self
    }

    /// Builds the request URL
    ///
    /// # Errors
    ///
    /// Fails when `fileformat` is missing, when neither `pub` nor `docid`
    /// is set, or when a publication other than the Bible has no `track`.
    pub fn build(&self) -> CatalogResult<Url> {
        if !self.has("fileformat") {
            return Err(CatalogError::MissingParameters("fileformat".to_string()));
        }
        if !self.has("pub") && !self.has("docid") {
            return Err(CatalogError::MissingParameters("pub or docid".to_string()));
        }
        if matches!(self.get("pub"), Some(code) if code != BIBLE_PUBLICATION) && !self.has("track") {
            return Err(CatalogError::MissingParameters("track".to_string()));
        }

        Url::parse_with_params(
            &self.endpoint,
            self.params.iter().map(|(k, v)| (*k, v.as_str())),
        )
        .map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", self.endpoint, e)))
    }
}

/// Top level of a catalog response: `files[language][FORMAT]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogResponse {
    pub files: HashMap<String, HashMap<String, Vec<Rendition>>>,
}

impl CatalogResponse {
    pub fn renditions(&self, language: &str, format: &str) -> &[Rendition] {
        self.files
            .get(language)
            .and_then(|formats| formats.get(&format.to_uppercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Rendition {
    pub title: String,
    pub label: String,
    pub file: RenditionFile,
    pub duration: Option<f64>,
    pub track: Option<u32>,
    pub markers: Option<MarkerSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenditionFile {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub markers: Vec<RawMarker>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMarker {
    pub verse_number: Option<u32>,
    pub start_time: String,
    pub duration: String,
}

/// Numeric value of a rendition label (`"720p"` is 720)
pub fn label_value(label: &str) -> Option<u32> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Highest-numbered rendition; the earliest one wins a tie
pub fn best_rendition(renditions: &[Rendition]) -> Option<&Rendition> {
    renditions.iter().fold(None, |best, candidate| match best {
        Some(current) if label_value(&current.label) >= label_value(&candidate.label) => {
            Some(current)
        }
        _ => Some(candidate),
    })
}
