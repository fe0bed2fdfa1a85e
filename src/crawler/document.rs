//! Document-query adapter over the HTML engine
//!
//! Parsers only see [`Document`] and [`Node`]; the `scraper` types stay
//! inside this module.

use crate::{CrawlError, CrawlResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

fn selector(selector: &str) -> CrawlResult<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// A parsed page together with the URL it was served from
#[derive(Debug)]
pub struct Document {
    html: Html,
    url: Url,
}

impl Document {
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            url,
        }
    }

    /// Final URL of the page, after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `scheme://host[:port]` of the page
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Trimmed text of the `<title>` element, if non-empty
    pub fn title(&self) -> Option<String> {
        self.select_first("title")
            .ok()
            .flatten()
            .map(|node| node.text().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// All elements matching `selector`, in document order
    pub fn select(&self, selector_str: &str) -> CrawlResult<Vec<Node<'_>>> {
        let selector = selector(selector_str)?;
        Ok(self
            .html
            .select(&selector)
            .map(|element| Node {
                element,
                document: self,
            })
            .collect())
    }

    pub fn select_first(&self, selector_str: &str) -> CrawlResult<Option<Node<'_>>> {
        let selector = selector(selector_str)?;
        Ok(self.html.select(&selector).next().map(|element| Node {
            element,
            document: self,
        }))
    }

    /// Resolves a possibly relative reference against the page URL
    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.url.join(href.trim()).ok()
    }
}

/// An element of a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
    document: &'a Document,
}

impl<'a> Node<'a> {
    fn wrap(&self, element: ElementRef<'a>) -> Node<'a> {
        Node {
            element,
            document: self.document,
        }
    }

    /// Lowercase tag name
    pub fn tag(&self) -> &'a str {
        self.element.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.element.value().classes()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text content, leaving out everything inside `tag` descendants
    pub fn text_without(&self, tag: &str) -> String {
        let own_id = self.element.id();
        let mut out = String::new();
        for node in self.element.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let excluded = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != own_id)
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map_or(false, |e| e.name().eq_ignore_ascii_case(tag))
                });
            if !excluded {
                out.push_str(text);
            }
        }
        out
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Descendants matching `selector`, in document order
    pub fn select(&self, selector_str: &str) -> CrawlResult<Vec<Node<'a>>> {
        let selector = selector(selector_str)?;
        Ok(self
            .element
            .select(&selector)
            .map(|element| self.wrap(element))
            .collect())
    }

    pub fn matches(&self, selector_str: &str) -> CrawlResult<bool> {
        Ok(selector(selector_str)?.matches(&self.element))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, selector_str: &str) -> CrawlResult<Option<Node<'a>>> {
        let selector = selector(selector_str)?;
        if selector.matches(&self.element) {
            return Ok(Some(*self));
        }
        Ok(self
            .element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| selector.matches(ancestor))
            .map(|ancestor| self.wrap(ancestor)))
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| self.wrap(parent))
    }

    pub fn next_element_sibling(&self) -> Option<Node<'a>> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(|sibling| self.wrap(sibling))
    }

    /// True when both handles point at the same element
    pub fn is_same(&self, other: &Node<'_>) -> bool {
        self.element.id() == other.element.id()
    }

    /// Absolute URL of the `href` attribute
    pub fn href(&self) -> Option<Url> {
        self.attr("href").and_then(|href| self.document.resolve(href))
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }
}
