use super::PageParser;
use crate::crawler::{CrawlerUtils, Document};
use crate::model::{ParsingResult, GROUP_SEPARATOR};
use crate::CrawlResult;
use async_trait::async_trait;

/// Parent group of the study article's media
pub const WATCHTOWER_GROUP: &str = "A Sentinela";

/// Weekend meeting: the study article linked from `.todayItem.pub-w`
///
/// The article is crawled twice: once for its songs (in an isolated
/// session, since the article crawl visits the same page) and once for its
/// images and videos, regrouped under `A Sentinela :: {article title}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendParser;

#[async_trait(?Send)]
impl PageParser for WeekendParser {
    fn name(&self) -> &'static str {
        "weekend"
    }

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>> {
        let Some(root) = doc.select_first(".todayItem.pub-w")? else {
            return Ok(None);
        };
        let Some(link) = root.select("a.pub-w")?.into_iter().next() else {
            return Ok(None);
        };
        let Some(url) = link.href() else {
            return Ok(None);
        };
        let title = link
            .parent()
            .map(|parent| parent.text().trim().to_string())
            .filter(|title| !title.is_empty());

        let (songs, article) = futures::try_join!(
            utils.fetch_songs_media(url.as_str(), true),
            utils.fetch_article_media(url.as_str()),
        )?;

        let mut media: Vec<ParsingResult> = songs.into_iter().map(|processed| processed.result).collect();
        media.extend(article.into_iter().map(|processed| {
            let mut result = processed.result;
            let heading = title.clone().unwrap_or_else(|| result.group.clone());
            result.group = [WATCHTOWER_GROUP, heading.as_str()].join(GROUP_SEPARATOR);
            result
        }));

        Ok(Some(media))
    }
}
