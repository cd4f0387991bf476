// Headlines shown on the disguise screen
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

impl Headline {
    pub fn new(title: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            source: source.to_string(),
        }
    }
}

/// What the disguise screen renders: headlines, plus a notice when the live
/// feed could not be loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsFeed {
    pub headlines: Vec<Headline>,
    pub live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Plausible local news, used whenever the live feed is empty or unreachable
pub fn canned_headlines() -> Vec<Headline> {
    vec![
        Headline::new("Local Community Raises Funds for Park Renovation", "Local News"),
        Headline::new("Weather Alert: Storm Expected This Weekend", "Weather Service"),
        Headline::new("New Shopping Mall to Open Downtown Next Month", "Business Daily"),
        Headline::new("School District Announces New Education Initiative", "Education Times"),
    ]
}
