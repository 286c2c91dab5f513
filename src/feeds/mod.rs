//! Bookmaker feed clients. Each client polls its upstream API and
//! normalizes the payload into [`FeedMatch`] records; nothing here
//! retries, a failed poll is simply reported to the caller.

pub mod betfair;
pub mod odds_api;
pub mod pinnacle;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::Result;
use crate::types::FeedMatch;

pub use betfair::BetfairClient;
pub use odds_api::OddsApiClient;
pub use pinnacle::PinnacleClient;

/// One enabled upstream feed.
pub enum Feed {
    OddsApi(OddsApiClient),
    Betfair(BetfairClient),
    Pinnacle(PinnacleClient),
}

impl Feed {
    pub fn name(&self) -> &'static str {
        match self {
            Feed::OddsApi(_) => odds_api::FEED_NAME,
            Feed::Betfair(_) => betfair::FEED_NAME,
            Feed::Pinnacle(_) => pinnacle::FEED_NAME,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<FeedMatch>> {
        match self {
            Feed::OddsApi(c) => c.fetch().await,
            Feed::Betfair(c) => c.fetch().await,
            Feed::Pinnacle(c) => c.fetch().await,
        }
    }
}

/// Builds a client for every feed whose credentials are configured.
pub fn feeds_from_config(cfg: &Config) -> Result<Vec<Feed>> {
    let timeout = Duration::from_secs(cfg.http_timeout_secs);
    let mut feeds = Vec::new();
    if let Some(c) = &cfg.odds_api {
        feeds.push(Feed::OddsApi(OddsApiClient::new(c.clone(), timeout)?));
    }
    if let Some(c) = &cfg.betfair {
        feeds.push(Feed::Betfair(BetfairClient::new(c.clone(), timeout)?));
    }
    if let Some(c) = &cfg.pinnacle {
        feeds.push(Feed::Pinnacle(PinnacleClient::new(c.clone(), timeout)?));
    }
    Ok(feeds)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

pub(crate) fn str_field<'a>(v: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|s| s.as_str())
}

/// Ids arrive as strings from some APIs and as numbers from others.
pub(crate) fn id_field(v: &serde_json::Value, key: &str) -> Option<String> {
    match v.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    v.get(key).and_then(|n| n.as_f64())
}
