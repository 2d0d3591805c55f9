//! Article text from JSON-LD structured data

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;

static LD_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// Schema.org types whose `text` property is the article body
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "BlogPosting",
    "Report",
    "ScholarlyArticle",
    "TechArticle",
];

/// Collect every article body declared in the page's JSON-LD blocks
///
/// Bodies are returned in document order; malformed blocks are skipped.
#[must_use]
pub fn article_bodies(document: &Html) -> Vec<String> {
    let mut bodies = Vec::new();

    for script in document.select(&LD_JSON) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => collect_bodies(&value, &mut bodies),
            Err(e) => tracing::debug!(error = %e, "skipping malformed ld+json block"),
        }
    }

    bodies
}

fn collect_bodies(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_bodies(item, out);
            }
        }
        Value::Object(map) => {
            let typed_text = is_article_type(map.get("@type"))
                .then(|| map.get("text").and_then(Value::as_str))
                .flatten();
            if let Some(body) = map.get("articleBody").and_then(Value::as_str).or(typed_text) {
                out.push(body.to_string());
            }

            for key in ["@graph", "mainEntity", "mainEntityOfPage"] {
                if let Some(nested) = map.get(key) {
                    collect_bodies(nested, out);
                }
            }
        }
        _ => {}
    }
}

fn is_article_type(value: Option<&Value>) -> bool {
    let matches = |t: &str| {
        let t = t.rsplit('/').next().unwrap_or(t);
        ARTICLE_TYPES.contains(&t)
    };

    match value {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}
