// News client - Top headlines from newsapi.org for the disguise screen
use crate::application::ports::HeadlineSource;
use crate::domain::error::SosError;
use crate::domain::news::Headline;
use crate::infrastructure::config::NewsSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TopHeadlines {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: reqwest::Client,
    settings: NewsSettings,
}

impl NewsApiClient {
    pub fn new(settings: NewsSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/v2/top-headlines?country={}&apiKey={}",
            self.settings.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.settings.country),
            urlencoding::encode(&self.settings.api_key)
        )
    }

    async fn fetch(&self) -> Result<Vec<Headline>> {
        let response = self
            .client
            .get(self.build_url())
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to the news API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("News API failed with status {}: {}", status, body);
        }

        let page = response
            .json::<TopHeadlines>()
            .await
            .context("Failed to parse news API response")?;
        Ok(headlines(page))
    }
}

/// Articles without a title are skipped
fn headlines(page: TopHeadlines) -> Vec<Headline> {
    page.articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title.filter(|t| !t.trim().is_empty())?;
            let source = article
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "Unknown".to_string());
            Some(Headline { title, source })
        })
        .collect()
}

#[async_trait]
impl HeadlineSource for NewsApiClient {
    async fn top_headlines(&self) -> Result<Vec<Headline>, SosError> {
        if self.settings.api_key.is_empty() {
            return Err(SosError::ResourceUnavailable("News feed".to_string()));
        }
        self.fetch().await.map_err(|e| {
            tracing::warn!("news feed: {:#}", e);
            SosError::ResourceUnavailable("News feed".to_string())
        })
    }
}
