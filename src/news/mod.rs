//! News search client
//!
//! Maps a spoken `(topic, outlet)` pair to candidate articles through the
//! backend `GET /news` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::NewsConfig;
use crate::ports::NewsSource;
use crate::{Error, Result};

/// Placeholder title NewsAPI uses for withdrawn articles
const REMOVED_TITLE: &str = "[Removed]";

/// A candidate news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline
    pub title: String,
    /// Publishing outlet name
    pub source_name: String,
    /// Link to the full article
    pub url: String,
    /// Short summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Search parameters built from the user's answers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsQuery {
    /// Free-text topic
    pub topic: Option<String>,
    /// Outlet name as spoken (not yet slugged)
    pub outlet: Option<String>,
}

impl NewsQuery {
    /// Build a query; blank answers mean "no constraint"
    #[must_use]
    pub fn new(topic: &str, outlet: &str) -> Self {
        let non_blank = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        Self {
            topic: non_blank(topic),
            outlet: non_blank(outlet),
        }
    }

    /// Outlet as a URL slug
    #[must_use]
    pub fn outlet_slug(&self) -> Option<String> {
        self.outlet.as_deref().map(slugify).filter(|s| !s.is_empty())
    }

    /// Query-string pairs in the order the backend expects
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(slug) = self.outlet_slug() {
            params.push(("source", slug));
        }
        if let Some(topic) = &self.topic {
            params.push(("q", topic.clone()));
        }
        params
    }
}

/// Lower-case an outlet name and join its words with hyphens
///
/// "BBC News" becomes "bbc-news".
#[must_use]
pub fn slugify(outlet: &str) -> String {
    outlet
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// `GET /news` response body
#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    #[serde(default)]
    name: Option<String>,
}

impl NewsApiArticle {
    fn into_article(self) -> Option<Article> {
        let title = self.title.map(|t| t.trim().to_string())?;
        let url = self.url.map(|u| u.trim().to_string())?;
        if title.is_empty() || url.is_empty() || title == REMOVED_TITLE {
            return None;
        }

        Some(Article {
            title,
            source_name: self
                .source
                .and_then(|s| s.name)
                .unwrap_or_default(),
            url,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

/// Client for the backend news endpoint
pub struct NewsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl NewsClient {
    /// Create a news client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &NewsConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout)
    }

    /// Create a news client against `base_url` with a request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: format!("{}/news", base_url.trim_end_matches('/')),
        })
    }

    /// Search for articles, surfacing failures
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed
    pub async fn try_search(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        let params = query.params();
        tracing::debug!(endpoint = %self.endpoint, ?params, "searching news");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::News(format!("news endpoint error {status}: {body}")));
        }

        let body: NewsResponse = response.json().await?;
        let articles: Vec<Article> = body
            .articles
            .into_iter()
            .filter_map(NewsApiArticle::into_article)
            .collect();

        tracing::info!(count = articles.len(), "news search complete");
        Ok(articles)
    }
}

#[async_trait]
impl NewsSource for NewsClient {
    async fn search(&self, query: &NewsQuery) -> Vec<Article> {
        match self.try_search(query).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(error = %e, "news search failed, treating as no results");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for NewsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("BBC News"), "bbc-news");
        assert_eq!(slugify("  the   Wall Street\tJournal "), "the-wall-street-journal");
        assert_eq!(slugify("cnn"), "cnn");
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn test_query_blank_answers_are_absent() {
        let query = NewsQuery::new("climate", "");
        assert_eq!(query.topic.as_deref(), Some("climate"));
        assert!(query.outlet.is_none());
        assert_eq!(query.params(), vec![("q", "climate".to_string())]);
    }

    #[test]
    fn test_query_params_order() {
        let query = NewsQuery::new("elections", "Associated Press");
        assert_eq!(
            query.params(),
            vec![
                ("source", "associated-press".to_string()),
                ("q", "elections".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_query_has_no_params() {
        assert!(NewsQuery::new(" ", "").params().is_empty());
    }

    #[test]
    fn test_article_mapping_drops_placeholders() {
        let body = r#"{"articles": [
            {"title": "Rates hold steady", "url": "https://example.com/a", "source": {"id": null, "name": "Example"}},
            {"title": "[Removed]", "url": "https://removed.com"},
            {"title": "No link"},
            {"title": "  ", "url": "https://example.com/blank"}
        ]}"#;

        let parsed: NewsResponse = serde_json::from_str(body).unwrap();
        let articles: Vec<Article> = parsed
            .articles
            .into_iter()
            .filter_map(NewsApiArticle::into_article)
            .collect();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Rates hold steady");
        assert_eq!(articles[0].source_name, "Example");
        assert!(articles[0].description.is_none());
    }
}
