//! Spoken messages

use crate::news::Article;

pub const DID_NOT_CATCH: &str = "Sorry, I didn't catch that.";

pub const STARTING_OVER: &str = "Let's start over.";

pub const NO_ARTICLES: &str = "No articles were found for the given topic and source.";

pub const NO_MORE_ARTICLES: &str =
    "No more articles available. Please choose from the current list.";

pub const EXTRACTION_FAILED: &str =
    "Could not extract readable content from this article. Please try a different article.";

pub const ARTICLE_ERROR: &str =
    "There was an error processing the article. Please try a different article.";

pub const READING_COMPLETE: &str = "Article reading completed.";

pub const CONTINUE_PROMPT: &str = "Would you like to read another article? Say yes or no.";

pub const CONTINUE_CLARIFICATION: &str =
    "I did not understand. Say yes to find another article, or no to finish.";

pub const FAREWELL: &str = "Okay. Thanks for listening, goodbye!";

/// Echo of a recorded answer
#[must_use]
pub fn you_said(answer: &str) -> String {
    format!("You said: {answer}")
}

/// Instruction for choosing from the current page
#[must_use]
pub fn selection_prompt(page_len: usize, has_next_page: bool) -> String {
    let choices = choice_range(page_len);
    if has_next_page {
        format!(
            "Say a number from {choices} to choose an article, or say 'more' to hear the next 5 articles."
        )
    } else {
        format!("Say a number from {choices} to choose an article.")
    }
}

/// Re-statement of the valid choices after an unrecognized reply
#[must_use]
pub fn selection_clarification(page_len: usize, has_next_page: bool) -> String {
    let choices = choice_range(page_len);
    if has_next_page {
        format!(
            "I did not understand. Say a number from {choices} to choose an article, or say 'more' for the next page."
        )
    } else {
        format!("I did not understand. Say a number from {choices} to choose an article.")
    }
}

/// Titles of the page, numbered from 1, followed by the selection prompt
#[must_use]
pub fn page_announcement(page: &[Article], has_next_page: bool) -> String {
    let titles: Vec<String> = page
        .iter()
        .enumerate()
        .map(|(i, article)| {
            format!(
                "Article {}: {}",
                i + 1,
                article.title.trim_end_matches(['.', ' '])
            )
        })
        .collect();

    format!(
        "{}. {}",
        titles.join(". "),
        selection_prompt(page.len(), has_next_page)
    )
}

fn choice_range(page_len: usize) -> String {
    if page_len <= 1 {
        "1".to_string()
    } else {
        format!("1 to {page_len}")
    }
}
