//! Pacing between sentences read aloud

use std::time::Duration;

use super::SessionTimings;

/// Pause to leave after speaking `sentence`
///
/// Longest after terminal punctuation, shorter after a clause break.
#[must_use]
pub fn pause_after(sentence: &str, timings: &SessionTimings) -> Duration {
    let last = sentence
        .trim_end()
        .trim_end_matches(['"', '\'', '\u{201D}', '\u{2019}', ')'])
        .chars()
        .last();

    match last {
        Some('.' | '!' | '?') => timings.sentence_pause,
        Some(',' | ';' | ':') => timings.clause_pause,
        _ => timings.phrase_pause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pauses() {
        let timings = SessionTimings::default();
        assert_eq!(pause_after("It ended.", &timings), Duration::from_millis(800));
        assert_eq!(pause_after("\"Why?\" ", &timings), Duration::from_millis(800));
        assert_eq!(pause_after("First of all,", &timings), Duration::from_millis(400));
        assert_eq!(pause_after("Breaking headline", &timings), Duration::from_millis(300));
    }
}
