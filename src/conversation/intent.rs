//! Interpreting transcripts: skip, article selection and continuation replies

/// Words accepted as a request for another article
const POSITIVE_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "continue", "another", "more", "please",
    "absolutely", "definitely",
];

/// Words accepted as ending the session
const NEGATIVE_WORDS: &[&str] = &[
    "no", "nope", "nah", "stop", "done", "quit", "exit", "finished", "enough", "goodbye", "bye",
];

/// Spoken numerals accepted during selection
const NUMBER_WORDS: &[(&str, usize)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
];

/// Lower-case, strip punctuation and trim a transcript
#[must_use]
pub fn normalize_transcript(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation() || *c == '\'' || *c == '-')
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a normalized transcript asks to skip the question
#[must_use]
pub fn is_skip(normalized: &str) -> bool {
    normalized.contains("skip")
}

/// Interpreted reply during article selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReply {
    /// Next page requested
    More,
    /// A 1-based number; may still be out of range for the page
    Choice(usize),
    /// Anything else
    Unrecognized,
}

/// Parse a normalized selection transcript
///
/// Accepts "more", digits, and the words "one" to "five", optionally with a
/// short lead-in such as "number three" or "article 2".
#[must_use]
pub fn parse_selection(normalized: &str) -> SelectionReply {
    let words: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| !matches!(*w, "number" | "article" | "option" | "the" | "please"))
        .collect();

    match words.as_slice() {
        ["more" | "next"] => SelectionReply::More,
        [word] => word
            .parse::<usize>()
            .ok()
            .or_else(|| {
                NUMBER_WORDS
                    .iter()
                    .find(|(name, _)| name == word)
                    .map(|(_, n)| *n)
            })
            .map_or(SelectionReply::Unrecognized, SelectionReply::Choice),
        _ => SelectionReply::Unrecognized,
    }
}

/// Interpreted reply to the "read another article?" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Positive,
    Negative,
    Unclear,
}

/// Classify a normalized transcript against the positive and negative words
///
/// A reply containing words from both lists is unclear.
#[must_use]
pub fn classify_continuation(normalized: &str) -> Continuation {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let positive = words.iter().any(|w| POSITIVE_WORDS.contains(w));
    let negative = words.iter().any(|w| NEGATIVE_WORDS.contains(w));

    match (positive, negative) {
        (true, false) => Continuation::Positive,
        (false, true) => Continuation::Negative,
        _ => Continuation::Unclear,
    }
}
