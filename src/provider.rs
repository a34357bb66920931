//! Headline provider access.
//!
//! The provider answers two kinds of query: the headline feed for a topic
//! token, and the article list for a story token. Both return the same raw
//! record shape ([`RawNewsRecord`]); normalizing those records is the job of
//! [`crate::headlines`] and [`crate::links`].
//!
//! [`SerpApiNews`] talks to the SerpAPI `google_news` engine.

use crate::models::{ProviderResponse, RawNewsRecord};
use std::error::Error;
use std::fmt;
use tracing::{debug, instrument};

/// Which feed to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsQuery<'a> {
    Topic(&'a str),
    Story(&'a str),
}

/// Language and region sent with every provider query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub region: String,
}

/// Source of raw headline and story records.
pub trait HeadlineProvider {
    async fn fetch(
        &self,
        query: NewsQuery<'_>,
        locale: &Locale,
    ) -> Result<Vec<RawNewsRecord>, Box<dyn Error>>;
}

/// SerpAPI `google_news` client.
pub struct SerpApiNews {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerpApiNews {
    pub fn new(api_key: &str, endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    fn query_params<'a>(&'a self, query: NewsQuery<'a>, locale: &'a Locale) -> Vec<(&'a str, &'a str)> {
        let (key, token) = match query {
            NewsQuery::Topic(token) => ("topic_token", token),
            NewsQuery::Story(token) => ("story_token", token),
        };
        vec![
            ("engine", "google_news"),
            (key, token),
            ("hl", locale.language.as_str()),
            ("gl", locale.region.as_str()),
            ("api_key", self.api_key.as_str()),
        ]
    }
}

impl fmt::Debug for SerpApiNews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApiNews")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HeadlineProvider for SerpApiNews {
    #[instrument(level = "info", skip_all, fields(?query))]
    async fn fetch(
        &self,
        query: NewsQuery<'_>,
        locale: &Locale,
    ) -> Result<Vec<RawNewsRecord>, Box<dyn Error>> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&self.query_params(query, locale))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("headline provider returned status {}", status).into());
        }

        let body: ProviderResponse = response.json().await?;
        debug!(count = body.news_results.len(), "Provider records received");
        Ok(body.news_results)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn locale() -> Locale {
        Locale {
            language: "en".to_string(),
            region: "US".to_string(),
        }
    }

    #[test]
    fn test_topic_query_params() {
        let client = SerpApiNews::new("secret", "https://serpapi.com/search.json");
        let loc = locale();
        let params = client.query_params(NewsQuery::Topic("TOPIC"), &loc);
        assert!(params.contains(&("engine", "google_news")));
        assert!(params.contains(&("topic_token", "TOPIC")));
        assert!(params.contains(&("hl", "en")));
        assert!(params.contains(&("gl", "US")));
        assert!(params.contains(&("api_key", "secret")));
    }

    #[test]
    fn test_story_query_params() {
        let client = SerpApiNews::new("secret", "https://serpapi.com/search.json");
        let loc = locale();
        let params = client.query_params(NewsQuery::Story("STORY"), &loc);
        assert!(params.contains(&("story_token", "STORY")));
        assert!(!params.iter().any(|(k, _)| *k == "topic_token"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = SerpApiNews::new("secret", "https://serpapi.com/search.json");
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
