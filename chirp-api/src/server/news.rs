//! Best-effort proxy for a third-party headlines feed.

use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const UPSTREAM_URL: &str = "https://newsapi.org/v2/top-headlines";

#[derive(Debug)]
pub struct NewsProxy {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl NewsProxy {
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    /// Whether an upstream key is configured at all. Without one the route
    /// serves placeholder content instead of calling out.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn fetch_headlines(&self) -> Result<Value, reqwest::Error> {
        let api_key = self.api_key.as_deref().unwrap_or_default();

        self.http
            .get(UPSTREAM_URL)
            .query(&[
                ("country", "us"),
                ("category", "technology"),
                ("pageSize", "5"),
                ("apiKey", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Static stand-in payload served when no upstream key is configured.
    #[must_use]
    pub fn placeholder_headlines(&self) -> Value {
        let published_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();

        json!({
            "articles": [
                {
                    "source": { "name": "TechCrunch" },
                    "title": "Sample Tech News Article",
                    "description": "This is a sample news article. Get your free News API key at newsapi.org",
                    "url": "https://newsapi.org",
                    "urlToImage": "https://via.placeholder.com/400x200",
                    "publishedAt": published_at,
                },
                {
                    "source": { "name": "The Verge" },
                    "title": "Another Sample Article",
                    "description": "Add NEWS_API_KEY to your .env file to see real news",
                    "url": "https://newsapi.org",
                    "urlToImage": "https://via.placeholder.com/400x200",
                    "publishedAt": published_at,
                },
            ],
        })
    }
}
