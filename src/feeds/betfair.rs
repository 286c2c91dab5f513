use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::config::BetfairConfig;
use crate::error::{AppError, Result};
use crate::feeds::{f64_field, http_client, id_field, now_ns, str_field};
use crate::types::{FeedMatch, MatchInfo, OddsObservation};

pub const FEED_NAME: &str = "betfair";

/// Bookmaker name stamped on every Betfair observation.
pub const BOOKMAKER: &str = "Betfair";

const DRAW_RUNNER: &str = "The Draw";
const SOCCER_EVENT_TYPE: &str = "1";
const MAX_RESULTS: u32 = 100;

/// Client for the Betfair Exchange betting REST API (MATCH_ODDS markets).
pub struct BetfairClient {
    cfg: BetfairConfig,
    client: reqwest::Client,
}

impl BetfairClient {
    pub fn new(cfg: BetfairConfig, timeout: Duration) -> Result<Self> {
        Ok(Self { cfg, client: http_client(timeout)? })
    }

    pub async fn fetch(&self) -> Result<Vec<FeedMatch>> {
        let catalogue = self
            .post(
                "listMarketCatalogue",
                json!({
                    "filter": {
                        "eventTypeIds": [SOCCER_EVENT_TYPE],
                        "marketTypeCodes": ["MATCH_ODDS"],
                    },
                    "marketProjection": ["RUNNER_DESCRIPTION", "MARKET_START_TIME", "EVENT"],
                    "maxResults": MAX_RESULTS.to_string(),
                }),
            )
            .await?;

        let market_ids: Vec<String> = catalogue
            .as_array()
            .ok_or_else(|| AppError::feed(FEED_NAME, "listMarketCatalogue response was not an array"))?
            .iter()
            .filter_map(|m| id_field(m, "marketId"))
            .collect();
        if market_ids.is_empty() {
            info!("[BETFAIR] no MATCH_ODDS markets listed");
            return Ok(Vec::new());
        }

        let books = self
            .post(
                "listMarketBook",
                json!({
                    "marketIds": market_ids,
                    "priceProjection": {"priceData": ["EX_BEST_OFFERS", "EX_TRADED"]},
                }),
            )
            .await?;

        let matches = parse_books(&catalogue, &books, now_ns());
        info!("[BETFAIR] {} matches from {} markets", matches.len(), market_ids.len());
        Ok(matches)
    }

    async fn post(&self, operation: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/{}/", self.cfg.base_url, operation);
        let resp = self
            .client
            .post(&url)
            .header("X-Application", &self.cfg.app_key)
            .header("X-Authentication", &self.cfg.session_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }
}

/// Joins market books with their catalogue entries. Each book yields one
/// 1X2 observation built from the best available-to-back price per runner.
///
/// Runner names come from the catalogue (by selection id), falling back to a
/// `runnerName` on the book runner itself. Event names are `"Home v Away"`.
pub fn parse_books(catalogue: &serde_json::Value, books: &serde_json::Value, taken_at_ns: u64) -> Vec<FeedMatch> {
    let lookup: HashMap<String, &serde_json::Value> = catalogue
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| Some((id_field(m, "marketId")?, m)))
        .collect();

    books
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|book| {
            let market = lookup.get(&id_field(book, "marketId")?)?;
            parse_book(market, book, taken_at_ns)
        })
        .collect()
}

fn parse_book(market: &serde_json::Value, book: &serde_json::Value, taken_at_ns: u64) -> Option<FeedMatch> {
    let event = market.get("event")?;
    let event_id = id_field(event, "id")?;
    let (home_team, away_team) = split_event_name(str_field(event, "name")?)?;
    let commence_time = str_field(event, "openDate")
        .or_else(|| str_field(market, "marketStartTime"))?
        .to_string();
    let league = str_field(event, "countryCode").unwrap_or("Unknown").to_string();

    let names: HashMap<String, &str> = market
        .get("runners")
        .and_then(|r| r.as_array())
        .into_iter()
        .flatten()
        .filter_map(|r| Some((id_field(r, "selectionId")?, str_field(r, "runnerName")?)))
        .collect();

    let mut prices: HashMap<&str, f64> = HashMap::new();
    for runner in book.get("runners").and_then(|r| r.as_array()).into_iter().flatten() {
        let name = id_field(runner, "selectionId")
            .and_then(|id| names.get(&id).copied())
            .or_else(|| str_field(runner, "runnerName"));
        let Some(name) = name else {
            continue;
        };
        if let Some(price) = best_back_price(runner) {
            prices.insert(name, price);
        }
    }

    let observation = OddsObservation::one_x_two(
        BOOKMAKER,
        taken_at_ns,
        prices.get(home_team.as_str()).copied(),
        prices.get(DRAW_RUNNER).copied(),
        prices.get(away_team.as_str()).copied(),
    );

    Some(FeedMatch {
        info: MatchInfo {
            match_id: format!("betfair_{event_id}"),
            league,
            home_team,
            away_team,
            commence_time,
        },
        observations: vec![observation],
    })
}

fn best_back_price(runner: &serde_json::Value) -> Option<f64> {
    let offers = runner.get("ex")?.get("availableToBack")?.as_array()?;
    f64_field(offers.first()?, "price")
}

fn split_event_name(name: &str) -> Option<(String, String)> {
    let (home, away) = name.split_once(" v ")?;
    let (home, away) = (home.trim(), away.trim());
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home.to_string(), away.to_string()))
}
