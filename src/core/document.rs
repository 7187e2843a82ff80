//! # Document Parsing
//!
//! Turns a fetched page's raw markup into the bits the router swaps in:
//! the page container's inner markup and its `data-*` metadata.
//!
//! Parsing goes through `scraper` (html5ever), which accepts anything a
//! browser would. The only thing checked is that a page container exists.

use std::collections::BTreeMap;
use std::fmt;

use scraper::{ElementRef, Html, Selector};

pub const DEFAULT_PAGE_SELECTOR: &str = ".js-page";

#[derive(Debug)]
pub enum DocumentError {
    /// The configured page selector is not valid CSS.
    BadSelector(String),
    /// No element in the markup matched the page selector.
    MissingPage,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::BadSelector(msg) => write!(f, "invalid page selector: {msg}"),
            DocumentError::MissingPage => write!(f, "no page container in document"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Page classification carried in `data-type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageType {
    /// A root index; the page is its own root.
    Index,
    /// An offcanvas page (about, etc.); rooted at `/`.
    Offcanvas,
    /// Anything else: a collection or detail page.
    Other(String),
}

/// Key/value metadata read from an element's `data-*` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    entries: BTreeMap<String, String>,
}

impl PageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects `data-*` attributes, dropping the `data-` prefix.
    pub fn from_attrs<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = attrs
            .into_iter()
            .filter_map(|(name, value)| {
                name.strip_prefix("data-")
                    .map(|key| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn page_type(&self) -> PageType {
        match self.get("type") {
            Some("index") => PageType::Index,
            Some("offcanvas") => PageType::Offcanvas,
            Some(other) => PageType::Other(other.to_string()),
            None => PageType::Other(String::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The page container extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFragment {
    pub markup: String,
    pub metadata: PageMetadata,
}

/// What analytics listeners get after a content swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub title: Option<String>,
    pub metadata: PageMetadata,
}

pub struct ParsedDocument {
    pub document: Html,
    pub fragment: PageFragment,
}

impl ParsedDocument {
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let title: String = self.document.select(&selector).next()?.text().collect();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            title: self.title(),
            metadata: self.fragment.metadata.clone(),
        }
    }
}

pub struct DocumentParser {
    page_selector: Selector,
}

impl DocumentParser {
    pub fn new(page_selector: &str) -> Result<Self, DocumentError> {
        let page_selector = Selector::parse(page_selector)
            .map_err(|e| DocumentError::BadSelector(e.to_string()))?;
        Ok(Self { page_selector })
    }

    /// Parses `html` into a detached tree and pulls out the first page
    /// container.
    pub fn parse_doc(&self, html: &str) -> Result<ParsedDocument, DocumentError> {
        let document = Html::parse_document(html);
        let fragment = {
            let page: ElementRef<'_> = document
                .select(&self.page_selector)
                .next()
                .ok_or(DocumentError::MissingPage)?;
            PageFragment {
                markup: page.inner_html(),
                metadata: PageMetadata::from_attrs(page.value().attrs()),
            }
        };
        Ok(ParsedDocument { document, fragment })
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self {
            page_selector: Selector::parse(DEFAULT_PAGE_SELECTOR)
                .expect("default page selector is valid CSS"),
        }
    }
}
