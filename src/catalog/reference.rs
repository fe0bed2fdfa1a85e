use super::{CatalogError, CatalogResult};
use url::form_urlencoded;

/// Scheme of generated reference handles
pub const REFERENCE_SCHEME: &str = "webpubvid";

/// Identifying parameters of one publication rendition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationRef {
    pub pub_code: Option<String>,
    pub docid: Option<String>,
    pub track: Option<String>,
    pub issue: Option<String>,
}

impl PublicationRef {
    /// Reads the parameters from the query string of any URL-like handle
    ///
    /// Only the query matters, so page links carrying the parameters
    /// (`...?pub=sjjm&track=5`) work as well as generated handles.
    pub fn parse(handle: &str) -> Self {
        let query = handle
            .split_once('?')
            .map(|(_, q)| q.split('#').next().unwrap_or(q))
            .unwrap_or("");

        let mut reference = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "pub" => reference.pub_code = Some(value),
                "docid" => reference.docid = Some(value),
                "track" => reference.track = Some(value),
                "issue" => reference.issue = Some(value),
                _ => {}
            }
        }
        reference
    }

    /// Fails unless (publication code or document id) and track are present
    pub fn validate(&self) -> CatalogResult<()> {
        if (self.pub_code.is_none() && self.docid.is_none()) || self.track.is_none() {
            return Err(CatalogError::MissingParameters(self.to_handle()));
        }
        Ok(())
    }

    /// Serializes the reference back into a handle
    pub fn to_handle(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(pub_code) = &self.pub_code {
            serializer.append_pair("pub", pub_code);
        }
        if let Some(docid) = &self.docid {
            serializer.append_pair("docid", docid);
        }
        if let Some(track) = &self.track {
            serializer.append_pair("track", track);
        }
        if let Some(issue) = &self.issue {
            serializer.append_pair("issue", issue);
        }
        format!("{}://?{}", REFERENCE_SCHEME, serializer.finish())
    }
}

/// Builds an opaque reference handle, independent of any page markup
///
/// # Examples
///
/// ```
/// use meeting_media::catalog::generate_reference_url;
///
/// assert_eq!(generate_reference_url("sjjm", 12, None), "webpubvid://?pub=sjjm&track=12");
/// assert_eq!(
///     generate_reference_url("mwb", 3, Some("202405")),
///     "webpubvid://?pub=mwb&track=3&issue=202405"
/// );
/// ```
pub fn generate_reference_url(pub_code: &str, track: impl ToString, issue: Option<&str>) -> String {
    PublicationRef {
        pub_code: Some(pub_code.to_string()),
        docid: None,
        track: Some(track.to_string()),
        issue: issue.map(str::to_string),
    }
    .to_handle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generated_handle() {
        let reference = PublicationRef::parse(&generate_reference_url("sjjm", 5, Some("2024")));
        assert_eq!(reference.pub_code.as_deref(), Some("sjjm"));
        assert_eq!(reference.track.as_deref(), Some("5"));
        assert_eq!(reference.issue.as_deref(), Some("2024"));
        assert!(reference.validate().is_ok());
    }

    #[test]
    fn test_parse_page_link() {
        let reference =
            PublicationRef::parse("https://www.example.org/finder?docid=1102024123&track=2&x=1#frag");
        assert_eq!(reference.docid.as_deref(), Some("1102024123"));
        assert_eq!(reference.track.as_deref(), Some("2"));
        assert!(reference.validate().is_ok());
    }

    #[test]
    fn test_missing_track_is_invalid() {
        let reference = PublicationRef::parse("webpubvid://?pub=sjjm");
        assert!(matches!(
            reference.validate(),
            Err(CatalogError::MissingParameters(_))
        ));
    }

    #[test]
    fn test_missing_publication_is_invalid() {
        let reference = PublicationRef::parse("webpubvid://?track=3&issue=1");
        assert!(reference.validate().is_err());
        assert!(PublicationRef::parse("no query at all").validate().is_err());
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let reference = PublicationRef::parse("webpubvid://?pub=&docid=99&track=1");
        assert_eq!(reference.pub_code, None);
        assert_eq!(reference.docid.as_deref(), Some("99"));
    }
}
