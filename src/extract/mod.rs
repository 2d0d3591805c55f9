//! Readable article text extraction
//!
//! Turns arbitrary article HTML into clean, speakable text and splits it into
//! sentences. Candidates are tried in order: JSON-LD `articleBody`, known
//! article container selectors, the largest block of own text, the whole
//! body, and finally the meta description. The winner is cleaned and must be
//! longer than [`ExtractorConfig::min_body_chars`].
//!
//! Extraction is pure: the same HTML always yields the same document.

pub mod classify;
pub mod sentences;
pub mod structured;
pub mod text;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;

use crate::{Error, Result};

use self::classify::{ElementInfo, NodeClass, classify, is_container_tag, is_noise_text, is_paragraph_tag};

pub use self::sentences::split_sentences;

/// Article container selectors, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    r#"[role="main"]"#,
    "main",
    ".article-content",
    ".article-body",
    ".story-body",
    ".post-content",
    ".entry-content",
    "#article-body",
];

static PARSED_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| (*s, Selector::parse(s).expect("valid selector")))
        .collect()
});

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("valid selector"));

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").expect("valid selector"));

/// Extraction thresholds, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Final text must be longer than this
    pub min_body_chars: usize,
    /// A selector match must be longer than this to win
    pub selector_min_chars: usize,
    /// An own-text block must be longer than this to be considered
    pub block_min_chars: usize,
    /// Sentences shorter than this are dropped
    pub min_sentence_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 100,
            selector_min_chars: 200,
            block_min_chars: 100,
            min_sentence_chars: 8,
        }
    }
}

/// Which strategy produced the article text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "selector")]
pub enum ContentSource {
    /// JSON-LD structured data
    StructuredData,
    /// A known article container
    Selector(&'static str),
    /// The element with the most own text
    LargestBlock,
    /// Every content node in `<body>`
    FullBody,
    /// `<meta name="description">`
    MetaDescription,
}

/// Clean article text ready to be read aloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    /// Cleaned body text, paragraphs separated by newlines
    pub body_text: String,
    /// Ordered, non-empty sentences
    pub sentences: Vec<String>,
    /// Strategy that produced `body_text`
    pub source: ContentSource,
}

/// Heuristic HTML content extractor
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    config: ExtractorConfig,
}

impl ContentExtractor {
    /// Create an extractor with custom thresholds
    #[must_use]
    pub const fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extraction thresholds in use
    #[must_use]
    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract readable text and sentences from an HTML page
    ///
    /// # Errors
    ///
    /// Returns `Error::Extraction` if no candidate is longer than the
    /// minimum body length or no sentence survives segmentation
    pub fn extract(&self, html: &str) -> Result<ExtractedDocument> {
        let document = Html::parse_document(html);

        let (source, body_text) = self
            .from_structured_data(&document)
            .or_else(|| self.from_selectors(&document))
            .or_else(|| self.from_largest_block(&document))
            .or_else(|| self.from_full_body(&document))
            .or_else(|| meta_description(&document))
            .ok_or_else(|| Error::Extraction("no readable content found".to_string()))?;

        let len = char_len(&body_text);
        if len <= self.config.min_body_chars {
            return Err(Error::Extraction(format!(
                "extracted text too short ({len} chars)"
            )));
        }

        let sentences = split_sentences(&body_text, self.config.min_sentence_chars);
        if sentences.is_empty() {
            return Err(Error::Extraction("no sentences found in article text".to_string()));
        }

        tracing::debug!(?source, chars = len, sentences = sentences.len(), "article extracted");

        Ok(ExtractedDocument {
            body_text,
            sentences,
            source,
        })
    }

    fn from_structured_data(&self, document: &Html) -> Option<(ContentSource, String)> {
        structured::article_bodies(document)
            .iter()
            .map(|body| text::clean_encoded(body))
            .find(|body| char_len(body) > self.config.min_body_chars)
            .map(|body| (ContentSource::StructuredData, body))
    }

    fn from_selectors(&self, document: &Html) -> Option<(ContentSource, String)> {
        PARSED_SELECTORS.iter().find_map(|&(name, ref selector)| {
            let best = document
                .select(selector)
                .filter(|element| !has_excluded_ancestor(*element))
                .map(|element| text::clean(&element_text(element)))
                .fold(None::<String>, |best, candidate| match best {
                    Some(b) if char_len(&b) >= char_len(&candidate) => Some(b),
                    _ => Some(candidate),
                })?;

            (char_len(&best) > self.config.selector_min_chars)
                .then_some((ContentSource::Selector(name), best))
        })
    }

    fn from_largest_block(&self, document: &Html) -> Option<(ContentSource, String)> {
        let root = body_element(document);
        let mut best: Option<String> = None;
        collect_blocks(root, self.config.block_min_chars, &mut best);
        best.map(|block| (ContentSource::LargestBlock, block))
    }

    fn from_full_body(&self, document: &Html) -> Option<(ContentSource, String)> {
        let body = text::clean(&element_text(body_element(document)));
        (char_len(&body) > self.config.min_body_chars).then_some((ContentSource::FullBody, body))
    }
}

/// Extract with default thresholds
///
/// # Errors
///
/// Returns `Error::Extraction` when the page has no readable article text
pub fn extract(html: &str) -> Result<ExtractedDocument> {
    ContentExtractor::default().extract(html)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn body_element(document: &Html) -> ElementRef<'_> {
    document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element())
}

fn meta_description(document: &Html) -> Option<(ContentSource, String)> {
    document.select(&META).find_map(|meta| {
        match classify(&ElementInfo::from_element(meta.value())) {
            NodeClass::MetaDescription(description) => {
                let description = text::clean(&description);
                (!description.is_empty()).then_some((ContentSource::MetaDescription, description))
            }
            _ => None,
        }
    })
}

fn is_content(element: ElementRef<'_>) -> bool {
    classify(&ElementInfo::from_element(element.value())) == NodeClass::Content
}

fn has_excluded_ancestor(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| !is_content(ancestor))
}

/// Accumulates text runs into lines
#[derive(Default)]
struct TextSink {
    lines: Vec<String>,
    current: String,
}

impl TextSink {
    fn push(&mut self, run: &str) {
        let run = run.trim();
        if is_noise_text(run) {
            return;
        }
        if !self.current.is_empty() {
            self.current.push(' ');
        }
        self.current.push_str(run);
    }

    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

/// Text of an element's content subtree
fn element_text(element: ElementRef<'_>) -> String {
    let mut sink = TextSink::default();
    walk_element(element, &mut sink);
    sink.finish()
}

fn walk_element(element: ElementRef<'_>, sink: &mut TextSink) {
    if !is_content(element) {
        return;
    }

    let paragraph = is_paragraph_tag(element.value().name());
    if paragraph {
        sink.break_line();
    }
    walk_children(element, sink, |_| true);
    if paragraph {
        sink.break_line();
    }
}

fn walk_children(element: ElementRef<'_>, sink: &mut TextSink, descend: impl Fn(ElementRef<'_>) -> bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(run) => sink.push(run),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child).filter(|c| descend(*c)) {
                    walk_element(child, sink);
                }
            }
            _ => {}
        }
    }
}

/// Text from direct text nodes and non-container children
fn own_text(element: ElementRef<'_>) -> String {
    let mut sink = TextSink::default();
    walk_children(element, &mut sink, |child| !is_container_tag(child.value().name()));
    sink.finish()
}

fn collect_blocks(element: ElementRef<'_>, min_chars: usize, best: &mut Option<String>) {
    if !is_content(element) {
        return;
    }

    let block = text::clean(&own_text(element));
    let len = char_len(&block);
    if len > min_chars && best.as_ref().is_none_or(|b| len > char_len(b)) {
        *best = Some(block);
    }

    for child in element.children().filter_map(ElementRef::wrap) {
        collect_blocks(child, min_chars, best);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(words: usize) -> String {
        (0..words)
            .map(|i| format!("Sentence number {i} describes the council vote in detail."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_text_sink_joins_inline_and_breaks_paragraphs() {
        let html = Html::parse_fragment("<div>Lead <b>in</b><p>First para</p>tail <span>end</span></div>");
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(element_text(div), "Lead in\nFirst para\ntail end");
    }

    #[test]
    fn test_own_text_skips_containers() {
        let html = Html::parse_fragment(
            "<section><p>Direct paragraph</p><div>Nested container text</div><em>inline</em></section>",
        );
        let section = html.select(&Selector::parse("section").unwrap()).next().unwrap();
        assert_eq!(own_text(section), "Direct paragraph\ninline");
    }

    #[test]
    fn test_selector_skips_excluded_ancestors() {
        let body = paragraph(6);
        let html = format!(
            "<html><body><aside><article>{teaser}</article></aside><article><p>{body}</p></article></body></html>",
            teaser = paragraph(8)
        );
        let doc = extract(&html).unwrap();
        assert_eq!(doc.source, ContentSource::Selector("article"));
        assert_eq!(doc.body_text, body);
    }

    #[test]
    fn test_meta_description_last_resort() {
        let description = paragraph(3);
        let html = format!(
            r#"<html><head><meta name="description" content="{description}"></head><body><nav>Home</nav></body></html>"#
        );
        let doc = extract(&html).unwrap();
        assert_eq!(doc.source, ContentSource::MetaDescription);
        assert_eq!(doc.sentences.len(), 3);
    }

    #[test]
    fn test_empty_page_fails() {
        assert!(matches!(extract(""), Err(Error::Extraction(_))));
        assert!(matches!(
            extract("<html><body><p>Too short.</p></body></html>"),
            Err(Error::Extraction(_))
        ));
    }
}
