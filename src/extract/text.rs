//! Text post-processing: entity decoding, boilerplate removal, whitespace

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Site furniture that leaks into article text
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:skip to (?:main )?content|skip to navigation|subscribe to (?:our|the) newsletter|sign up for (?:our|the) newsletter|click here to subscribe|advertisement|continue reading below|share this article|all rights reserved|accept all cookies)\b[.:]?",
    )
    .expect("valid regex")
});

/// Decode HTML character references (`&amp;`, `&#8217;`, ...)
#[must_use]
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    // Escape tag openers so the fragment parse only resolves references
    let escaped = text.replace('<', "&lt;");
    Html::parse_fragment(&escaped).root_element().text().collect()
}

/// Remove boilerplate phrases, case-insensitively
#[must_use]
pub fn strip_boilerplate(text: &str) -> String {
    BOILERPLATE.replace_all(text, "").into_owned()
}

/// Collapse whitespace runs to single spaces, keeping one newline per paragraph
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean-up for text read from the parsed DOM, whose references are already resolved
#[must_use]
pub fn clean(text: &str) -> String {
    let stripped = strip_boilerplate(text);
    collapse_whitespace(&stripped).trim().to_string()
}

/// Clean-up for raw strings that may still carry character references
#[must_use]
pub fn clean_encoded(text: &str) -> String {
    clean(&decode_entities(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Fish &amp; chips"), "Fish & chips");
        assert_eq!(decode_entities("It&#8217;s &quot;done&quot;"), "It\u{2019}s \"done\"");
        assert_eq!(decode_entities("a < b &amp; c"), "a < b & c");
        assert_eq!(decode_entities("plain <b>text</b>"), "plain <b>text</b>");
    }

    #[test]
    fn test_strip_boilerplate() {
        assert_eq!(
            collapse_whitespace(&strip_boilerplate("Skip to content\nThe vote passed. ADVERTISEMENT More.")),
            "The vote passed. More."
        );
        assert_eq!(
            strip_boilerplate("Subscribe to our newsletter: weekly"),
            " weekly"
        );
    }

    #[test]
    fn test_collapse_whitespace_keeps_paragraphs() {
        let text = "  First   line \n\n\n\t second\tline  \n   \n";
        assert_eq!(collapse_whitespace(text), "First line\nsecond line");
    }

    #[test]
    fn test_clean_is_stable() {
        let once = clean_encoded("  Rates &amp; bonds\n\nAdvertisement\n moved.  ");
        assert_eq!(once, "Rates & bonds\nmoved.");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn test_clean_keeps_literal_references() {
        assert_eq!(clean("Write &lt;div&gt; to open a block."), "Write &lt;div&gt; to open a block.");
    }
}
