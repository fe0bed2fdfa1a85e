use super::PageParser;
use crate::crawler::{CrawlerUtils, Document, Node};
use crate::model::{MediaEntry, MediaKind, ParsedText, ParsingResult};
use crate::CrawlResult;
use async_trait::async_trait;

/// Group of Bible reading results
pub const BIBLE_GROUP: &str = "bible";

/// Verse text of one Bible chapter, paired with the chapter's audio
///
/// The result is a single `text` entry: the verses as lightweight markup
/// (`<sup>` verse numbers, one `<span id="vN">` per verse, `<br/>` between
/// paragraphs and `[...]` for skipped verses) plus the audio URL and the
/// time markers of the requested verses.
#[derive(Debug, Clone)]
pub struct BibleParser {
    booknum: u32,
    chapter: u32,
    verses: Vec<u32>,
}

impl BibleParser {
    pub fn new(booknum: u32, chapter: u32, verses: Vec<u32>) -> Self {
        Self {
            booknum,
            chapter,
            verses,
        }
    }

    pub fn uid(&self) -> String {
        let verses: Vec<String> = self.verses.iter().map(u32::to_string).collect();
        format!("bible-{}-{}-{}", self.booknum, self.chapter, verses.join(":"))
    }

    fn content(&self, doc: &Document) -> CrawlResult<String> {
        let mut content: Vec<String> = Vec::new();
        let mut previous: Option<Node<'_>> = None;

        for (i, &verse) in self.verses.iter().enumerate() {
            if i > 0 && verse > self.verses[i - 1].saturating_add(1) {
                content.push("<br/> [...] ".to_string());
            }

            let selector = format!(r#"[id^="v{}-{}-{}-"]"#, self.booknum, self.chapter, verse);
            let segments = doc.select(&selector)?;
            let last = segments.len().saturating_sub(1);

            for (j, segment) in segments.iter().enumerate() {
                let mut text = String::new();
                let parent_changed = match (previous.and_then(|p| p.parent()), segment.parent()) {
                    (Some(before), Some(now)) => !before.is_same(&now),
                    _ => false,
                };
                if parent_changed {
                    text.push_str("<br/>");
                }
                if j == 0 {
                    text.push_str(&format!("<sup>{}</sup><span id=\"v{}\">", verse, verse));
                }
                text.push_str(segment.text_without("a").trim());
                if j == last {
                    text.push_str("</span>");
                }
                content.push(text);
                previous = Some(*segment);
            }
        }

        Ok(content.join("\n"))
    }
}

#[async_trait(?Send)]
impl PageParser for BibleParser {
    fn name(&self) -> &'static str {
        "bible"
    }

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>> {
        let content = self.content(doc)?;
        let audio = utils
            .resolver()
            .chapter_audio(self.booknum, self.chapter, &self.verses)
            .await?;

        let text = ParsedText {
            booknum: self.booknum,
            chapter: self.chapter,
            verses: self.verses.clone(),
            content,
            audio_url: audio.url,
            duration: audio.duration,
            markers: audio.markers,
        };

        Ok(Some(vec![ParsingResult {
            uid: Some(self.uid()),
            group: BIBLE_GROUP.to_string(),
            label: String::new(),
            alt: Some(String::new()),
            kind: MediaKind::Text,
            media: vec![MediaEntry::Text(text)],
        }]))
    }
}
