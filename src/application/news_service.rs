// News service - Headline feed behind the disguise screen
use crate::application::ports::HeadlineSource;
use crate::domain::news::{canned_headlines, NewsFeed};
use std::sync::Arc;

const FEED_ERROR: &str = "Failed to load news. Pull down to refresh.";

#[derive(Clone)]
pub struct NewsService {
    source: Arc<dyn HeadlineSource>,
}

impl NewsService {
    pub fn new(source: Arc<dyn HeadlineSource>) -> Self {
        Self { source }
    }

    /// Live headlines when there are any. The screen must always look like a
    /// news app, so an empty or failed fetch still returns canned headlines.
    pub async fn feed(&self) -> NewsFeed {
        match self.source.top_headlines().await {
            Ok(headlines) if !headlines.is_empty() => NewsFeed {
                headlines,
                live: true,
                notice: None,
            },
            Ok(_) => NewsFeed {
                headlines: canned_headlines(),
                live: false,
                notice: None,
            },
            Err(e) => {
                tracing::debug!("serving canned headlines: {}", e);
                NewsFeed {
                    headlines: canned_headlines(),
                    live: false,
                    notice: Some(FEED_ERROR.to_string()),
                }
            }
        }
    }
}
