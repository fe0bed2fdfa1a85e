use super::article::video_media;
use super::PageParser;
use crate::catalog::{generate_reference_url, SONG_PUBLICATION};
use crate::crawler::{CrawlerUtils, Document};
use crate::model::{MediaKind, ParsingResult};
use crate::CrawlResult;
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use std::sync::OnceLock;

/// Group of every song result; sorted ahead of all other groups
pub const SONGS_GROUP: &str = "Cânticos";

/// Song link texts, tried in order until one matches
const SONG_MARKERS: [&str; 3] = ["CÂNTICO", "Cântico", "cântico"];

/// Display label of a song video
///
/// A leading `"{number}. "` in the catalog title is replaced by the
/// zero-padded number and a dash.
///
/// # Examples
///
/// ```
/// use meeting_media::parsers::song_label;
///
/// assert_eq!(song_label(5, "5. Deus criou tudo"), "Cântico 05 - Deus criou tudo");
/// assert_eq!(song_label(151, "151. Ele chamará"), "Cântico 151 - Ele chamará");
/// assert_eq!(song_label(3, "Sem número"), "Cântico Sem número");
/// ```
pub fn song_label(song: u32, title: &str) -> String {
    static NUMBER_PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let prefix = NUMBER_PREFIX.get_or_init(|| Regex::new(r"^(\d+)\.\s*").ok());

    let numbered = prefix
        .as_ref()
        .and_then(|re| re.captures(title))
        .filter(|caps| caps[1].parse::<u32>().ok() == Some(song))
        .and_then(|caps| caps.get(0));
    let label = match numbered {
        Some(m) => format!("{:02} - {}", song, &title[m.end()..]),
        None => title.to_string(),
    };
    format!("Cântico {}", label)
}

/// Song videos referenced by the links of an article
///
/// Song numbers come from the digits of every link whose text mentions a
/// song; each number is resolved against the songbook publication.
#[derive(Debug, Clone, Copy, Default)]
pub struct SongsParser;

impl SongsParser {
    fn song_numbers(doc: &Document) -> CrawlResult<Vec<u32>> {
        let anchors = doc.select("a")?;
        let texts: Vec<String> = anchors.iter().map(|a| a.text()).collect();

        let matching: Vec<&String> = SONG_MARKERS
            .iter()
            .map(|marker| texts.iter().filter(|t| t.contains(*marker)).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        let mut numbers = Vec::new();
        for text in matching {
            let digits: String = text.chars().filter(char::is_ascii_digit).collect();
            if let Ok(number) = digits.parse::<u32>() {
                if !numbers.contains(&number) {
                    numbers.push(number);
                }
            }
        }
        Ok(numbers)
    }
}

#[async_trait(?Send)]
impl PageParser for SongsParser {
    fn name(&self) -> &'static str {
        "songs"
    }

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>> {
        if doc.select_first("#article")?.is_none() {
            return Ok(None);
        }

        let numbers = Self::song_numbers(doc)?;
        let videos = join_all(numbers.iter().map(|&song| async move {
            let handle = generate_reference_url(SONG_PUBLICATION, song, None);
            utils
                .fetch_publication_video(&handle)
                .await
                .map(|video| (song, video))
        }))
        .await;

        Ok(Some(
            videos
                .into_iter()
                .flatten()
                .map(|(song, video)| {
                    let label = song_label(song, &video.title);
                    ParsingResult::new(SONGS_GROUP, label.as_str(), MediaKind::Video, video_media(&video))
                        .with_alt(label)
                })
                .collect(),
        ))
    }
}
