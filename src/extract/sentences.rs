//! Sentence segmentation for read-aloud

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "ft.", "gen.", "gov.",
    "sen.", "rep.", "pres.", "lt.", "col.", "sgt.", "capt.", "cmdr.", "adm.", "rev.", "hon.",
    "inc.", "ltd.", "co.", "corp.", "dept.", "univ.", "assn.", "bros.", "vs.", "etc.", "approx.",
    "vol.", "fig.", "est.", "jan.", "feb.", "mar.", "apr.", "jun.", "jul.", "aug.",
    "sep.", "sept.", "oct.", "nov.", "dec.",
];

const TERMINATORS: &[char] = &['.', '!', '?'];

const CLOSING: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']'];

const OPENING: &[char] = &['"', '\'', '\u{201C}', '\u{2018}', '(', '['];

/// Split text into sentences
///
/// A sentence ends at `.`, `!` or `?` (with any closing quotes) followed by
/// whitespace and an upper-case letter, or at the end of the text. Line breaks
/// always end a sentence. Fragments shorter than `min_chars` are dropped.
#[must_use]
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    text.lines()
        .flat_map(split_line)
        .filter(|s| s.chars().count() >= min_chars)
        .collect()
}

fn split_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !TERMINATORS.contains(&chars[i]) {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && TERMINATORS.contains(&chars[end]) {
            end += 1;
        }
        while end < chars.len() && CLOSING.contains(&chars[end]) {
            end += 1;
        }

        if is_boundary(&chars, i, end) {
            push_trimmed(&mut sentences, &chars[start..end]);
            start = end;
        }
        i = end;
    }

    push_trimmed(&mut sentences, &chars[start..]);
    sentences
}

/// Whether the terminator run `chars[at..end]` closes a sentence
fn is_boundary(chars: &[char], at: usize, end: usize) -> bool {
    if end < chars.len() && !chars[end].is_whitespace() {
        return false;
    }

    let next = chars[end..].iter().position(|c| !c.is_whitespace()).map(|p| end + p);
    let starts_sentence = match next {
        None => true,
        Some(j) if chars[j].is_uppercase() => true,
        Some(j) => {
            OPENING.contains(&chars[j]) && chars.get(j + 1).is_some_and(|c| c.is_uppercase())
        }
    };
    if !starts_sentence {
        return false;
    }

    // Only a lone period can belong to an abbreviation
    !(chars[at] == '.' && end - at == 1 && next.is_some() && is_abbreviation(&word_before(chars, at)))
}

/// The word ending with the period at `at`, without leading punctuation
fn word_before(chars: &[char], at: usize) -> String {
    let begin = chars[..at]
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |p| p + 1);

    chars[begin..=at]
        .iter()
        .skip_while(|c| OPENING.contains(c))
        .collect()
}

fn is_abbreviation(word: &str) -> bool {
    let lower = word.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }

    // Initials and dotted acronyms: "J.", "U.S.", "e.g.", "a.m."
    let parts: Vec<&str> = word.trim_end_matches('.').split('.').collect();
    parts
        .iter()
        .all(|p| p.chars().count() == 1 && p.chars().all(char::is_alphabetic))
        && (parts.len() > 1 || word.chars().next().is_some_and(char::is_uppercase))
}

fn push_trimmed(out: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        out.push(sentence.to_string());
    }
}
