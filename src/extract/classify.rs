//! Node classification and text filtering

/// Tags whose whole subtree never carries article text
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "noscript", "iframe",
    "svg", "template", "select", "dialog",
];

/// Class-name fragments marking chrome around the article
const NOISE_CLASS_FRAGMENTS: &[&str] = &[
    "nav", "menu", "sidebar", "footer", "header", "share", "social", "byline", "caption", "promo",
    "metadata", "timestamp", "author", "related", "btn", "advert", "newsletter", "cookie",
];

/// Class segments matched whole, so "header" or "read" are not mistaken for ads
const NOISE_CLASS_SEGMENTS: &[&str] = &["ad", "ads"];

/// Class prefixes describing page state rather than the element itself
const MODIFIER_PREFIXES: &[&str] = &["has-", "with-", "no-", "is-"];

/// Final class segments naming a layout wrapper around the whole page
const LAYOUT_SUFFIXES: &[&str] = &["layout", "wrapper", "wrap", "container", "page", "site"];

/// Document roots, judged by tag alone
const ROOT_TAGS: &[&str] = &["html", "body", "main"];

/// ARIA landmark roles that hold page chrome
const NOISE_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary", "dialog"];

/// Short affordance labels for sharing and printing
const SHARE_KEYWORDS: &[&str] = &[
    "share",
    "facebook",
    "twitter",
    "tweet",
    "copy link",
    "print",
    "email",
    "linkedin",
    "reddit",
    "whatsapp",
    "pinterest",
    "messenger",
    "comments",
];

/// Tags that begin a new line of text
const PARAGRAPH_TAGS: &[&str] = &["p", "h1", "h2", "h3", "li", "blockquote", "article", "section"];

/// Layout containers; their text does not count toward a parent's own text
const CONTAINER_TAGS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "table", "tbody", "thead", "tr", "td",
    "figure", "details",
];

/// Texts at or above this length are never treated as share labels
const SHARE_LABEL_MAX_CHARS: usize = 40;

/// Meta names carrying a page summary
const DESCRIPTION_META: &[&str] = &["description", "og:description", "twitter:description"];

/// Element facts needed for classification
#[derive(Debug, Clone, Default)]
pub struct ElementInfo<'a> {
    /// Lower-case tag name
    pub tag: &'a str,
    /// Raw `class` attribute
    pub class: Option<&'a str>,
    /// Remaining attributes
    pub attrs: Vec<(&'a str, &'a str)>,
}

impl<'a> ElementInfo<'a> {
    /// Element with a tag and optional class
    #[must_use]
    pub fn new(tag: &'a str, class: Option<&'a str>) -> Self {
        Self {
            tag,
            class,
            attrs: Vec::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attr(mut self, name: &'a str, value: &'a str) -> Self {
        self.attrs.push((name, value));
        self
    }

    /// Capture a parsed element
    #[must_use]
    pub fn from_element(element: &'a scraper::node::Element) -> Self {
        Self {
            tag: element.name(),
            class: element.attr("class"),
            attrs: element.attrs().filter(|(name, _)| *name != "class").collect(),
        }
    }

    /// Look up an attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }
}

/// Outcome of classifying one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClass {
    /// Skip the element and its subtree
    Exclude,
    /// Page summary from a `<meta>` tag
    MetaDescription(String),
    /// Walk the element for text
    Content,
}

/// Classify an element as content, chrome or page summary
#[must_use]
pub fn classify(info: &ElementInfo<'_>) -> NodeClass {
    let tag = info.tag.to_ascii_lowercase();

    if tag == "meta" {
        let key = info.attr("name").or_else(|| info.attr("property"));
        let content = info.attr("content").map(str::trim).unwrap_or_default();
        return match key {
            Some(key)
                if !content.is_empty()
                    && DESCRIPTION_META.iter().any(|m| key.eq_ignore_ascii_case(m)) =>
            {
                NodeClass::MetaDescription(content.to_string())
            }
            _ => NodeClass::Exclude,
        };
    }

    if EXCLUDED_TAGS.contains(&tag.as_str()) {
        return NodeClass::Exclude;
    }

    if ROOT_TAGS.contains(&tag.as_str()) {
        return NodeClass::Content;
    }

    if info.attr("hidden").is_some()
        || info.attr("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return NodeClass::Exclude;
    }

    if info
        .attr("role")
        .is_some_and(|role| NOISE_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r)))
    {
        return NodeClass::Exclude;
    }

    if info.class.is_some_and(has_noise_class) {
        return NodeClass::Exclude;
    }

    NodeClass::Content
}

fn has_noise_class(class: &str) -> bool {
    class.split_whitespace().any(|token| {
        let token = token.to_ascii_lowercase();
        if is_layout_token(&token) {
            return false;
        }
        NOISE_CLASS_FRAGMENTS.iter().any(|f| token.contains(f))
            || token
                .split(['-', '_'])
                .any(|segment| NOISE_CLASS_SEGMENTS.contains(&segment))
    })
}

/// "has-sidebar" or "sticky-header-layout" describe the page, not chrome
fn is_layout_token(token: &str) -> bool {
    MODIFIER_PREFIXES.iter().any(|p| token.starts_with(p))
        || token
            .rsplit(['-', '_'])
            .next()
            .is_some_and(|last| token.len() > last.len() && LAYOUT_SUFFIXES.contains(&last))
}

/// Whether a text run is empty, a stray character, or a share/print label
#[must_use]
pub fn is_noise_text(text: &str) -> bool {
    let text = text.trim();
    let len = text.chars().count();
    if len <= 1 {
        return true;
    }
    if len >= SHARE_LABEL_MAX_CHARS {
        return false;
    }

    let lower = text.to_lowercase();
    SHARE_KEYWORDS.iter().any(|keyword| {
        lower.strip_prefix(keyword).is_some_and(|rest| {
            rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
        })
    })
}

/// Whether the tag starts a new line of text
#[must_use]
pub fn is_paragraph_tag(tag: &str) -> bool {
    PARAGRAPH_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

/// Whether the tag is a layout container
#[must_use]
pub fn is_container_tag(tag: &str) -> bool {
    CONTAINER_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}
