use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::OddsApiConfig;
use crate::error::{AppError, Result};
use crate::feeds::{f64_field, http_client, now_ns, str_field};
use crate::types::{FeedMatch, MatchInfo, OddsObservation};

pub const FEED_NAME: &str = "odds_api";

/// Client for The Odds API v4 (`/sports/{league}/odds`).
pub struct OddsApiClient {
    cfg: OddsApiConfig,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(cfg: OddsApiConfig, timeout: Duration) -> Result<Self> {
        Ok(Self { cfg, client: http_client(timeout)? })
    }

    /// Polls every configured league. A league that fails is logged and
    /// skipped; the others still count. Fails only when every league failed.
    pub async fn fetch(&self) -> Result<Vec<FeedMatch>> {
        let mut results = Vec::with_capacity(self.cfg.leagues.len());
        for league in &self.cfg.leagues {
            results.push((league.as_str(), self.fetch_league(league).await));
        }
        let matches = merge_leagues(results)?;
        info!("[ODDS_API] {} matches across {} leagues", matches.len(), self.cfg.leagues.len());
        Ok(matches)
    }

    async fn fetch_league(&self, league: &str) -> Result<Vec<FeedMatch>> {
        let url = format!("{}/{}/odds", self.cfg.base_url, league);
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.cfg.api_key.as_str()),
                ("regions", self.cfg.regions.as_str()),
                ("markets", "h2h,totals"),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !resp.is_array() {
            return Err(AppError::feed(FEED_NAME, format!("{league}: response was not an array")));
        }
        Ok(parse_events(&resp, now_ns()))
    }
}

/// Concatenates per-league results, logging failed leagues. Errors when
/// there was at least one league and none succeeded.
pub fn merge_leagues(results: Vec<(&str, Result<Vec<FeedMatch>>)>) -> Result<Vec<FeedMatch>> {
    let total = results.len();
    let mut failed = 0;
    let mut matches = Vec::new();
    for (league, result) in results {
        match result {
            Ok(found) => {
                debug!(league = %league, matches = found.len(), "[ODDS_API] league fetched");
                matches.extend(found);
            }
            Err(e) => {
                failed += 1;
                warn!(league = %league, "[ODDS_API] league fetch failed: {e}");
            }
        }
    }
    if total > 0 && failed == total {
        return Err(AppError::feed(FEED_NAME, format!("all {total} leagues failed")));
    }
    Ok(matches)
}

/// Normalizes an `/odds` response. Every bookmaker's `h2h` market becomes a
/// 1X2 observation and every `totals` market an Over/Under observation, all
/// stamped with `taken_at_ns`. Events missing an id, kickoff or teams are dropped.
pub fn parse_events(payload: &serde_json::Value, taken_at_ns: u64) -> Vec<FeedMatch> {
    let Some(events) = payload.as_array() else {
        return Vec::new();
    };
    events.iter().filter_map(|e| parse_event(e, taken_at_ns)).collect()
}

fn parse_event(event: &serde_json::Value, taken_at_ns: u64) -> Option<FeedMatch> {
    let match_id = str_field(event, "id")?.to_string();
    let commence_time = str_field(event, "commence_time")?.to_string();
    let home_team = str_field(event, "home_team")?.to_string();
    let away_team = match str_field(event, "away_team") {
        Some(a) => a.to_string(),
        None => event
            .get("teams")?
            .as_array()?
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != home_team)?
            .to_string(),
    };
    let league = str_field(event, "sport_key").unwrap_or("unknown").to_string();

    let mut observations = Vec::new();
    for bookmaker in event.get("bookmakers").and_then(|b| b.as_array()).into_iter().flatten() {
        let Some(title) = str_field(bookmaker, "title") else {
            continue;
        };
        for market in bookmaker.get("markets").and_then(|m| m.as_array()).into_iter().flatten() {
            let outcomes: &[serde_json::Value] = market
                .get("outcomes")
                .and_then(|o| o.as_array())
                .map(|o| o.as_slice())
                .unwrap_or(&[]);
            match str_field(market, "key") {
                Some("h2h") => {
                    observations.push(h2h_observation(title, outcomes, &home_team, &away_team, taken_at_ns));
                }
                Some("totals") => {
                    observations.push(totals_observation(title, outcomes, taken_at_ns));
                }
                _ => {}
            }
        }
    }

    Some(FeedMatch {
        info: MatchInfo { match_id, league, home_team, away_team, commence_time },
        observations,
    })
}

fn h2h_observation(
    bookmaker: &str,
    outcomes: &[serde_json::Value],
    home_team: &str,
    away_team: &str,
    taken_at_ns: u64,
) -> OddsObservation {
    let (mut home, mut draw, mut away) = (None, None, None);
    for outcome in outcomes {
        let Some(name) = str_field(outcome, "name") else {
            continue;
        };
        let price = f64_field(outcome, "price");
        if name.eq_ignore_ascii_case(home_team) {
            home = price;
        } else if name.eq_ignore_ascii_case(away_team) {
            away = price;
        } else if name.eq_ignore_ascii_case("draw") {
            draw = price;
        }
    }
    OddsObservation::one_x_two(bookmaker, taken_at_ns, home, draw, away)
}

fn totals_observation(bookmaker: &str, outcomes: &[serde_json::Value], taken_at_ns: u64) -> OddsObservation {
    let (mut line, mut over, mut under) = (None, None, None);
    for outcome in outcomes {
        let name = str_field(outcome, "name").unwrap_or("").to_ascii_lowercase();
        if name.contains("over") {
            over = f64_field(outcome, "price");
            line = f64_field(outcome, "point").or(line);
        } else if name.contains("under") {
            under = f64_field(outcome, "price");
            line = f64_field(outcome, "point").or(line);
        }
    }
    OddsObservation::over_under(bookmaker, taken_at_ns, line, over, under)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketKind;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!([
            {
                "id": "e912",
                "sport_key": "soccer_brazil_serieb",
                "commence_time": "2026-10-18T22:00:00Z",
                "home_team": "Coritiba",
                "away_team": "Avai",
                "bookmakers": [
                    {
                        "key": "pinnacle",
                        "title": "Pinnacle",
                        "markets": [
                            {
                                "key": "h2h",
                                "outcomes": [
                                    {"name": "Coritiba", "price": 2.05},
                                    {"name": "Avai", "price": 3.9},
                                    {"name": "Draw", "price": 3.25}
                                ]
                            },
                            {
                                "key": "totals",
                                "outcomes": [
                                    {"name": "Over", "price": 2.1, "point": 2.5},
                                    {"name": "Under", "price": 1.75, "point": 2.5}
                                ]
                            },
                            {"key": "spreads", "outcomes": []}
                        ]
                    }
                ]
            }
        ])
    }

    #[test]
    fn h2h_and_totals_become_observations() {
        let matches = parse_events(&sample(), 42);
        assert_eq!(matches.len(), 1);

        let m = &matches[0];
        assert_eq!(m.info.match_id, "e912");
        assert_eq!(m.info.league, "soccer_brazil_serieb");
        assert_eq!(m.info.away_team, "Avai");
        assert_eq!(m.observations.len(), 2);

        let h2h = &m.observations[0];
        assert_eq!(h2h.market, MarketKind::OneXTwo);
        assert_eq!(h2h.bookmaker, "Pinnacle");
        assert_eq!(h2h.timestamp_ns, 42);
        assert_eq!((h2h.home, h2h.draw, h2h.away), (Some(2.05), Some(3.25), Some(3.9)));

        let totals = &m.observations[1];
        assert_eq!(totals.market, MarketKind::OverUnder);
        assert_eq!((totals.total_line, totals.over, totals.under), (Some(2.5), Some(2.1), Some(1.75)));
    }

    #[test]
    fn away_team_falls_back_to_teams_list() {
        let payload = json!([{
            "id": "e1",
            "commence_time": "2026-10-18T22:00:00Z",
            "home_team": "Kaizer Chiefs",
            "teams": ["Kaizer Chiefs", "Orlando Pirates"]
        }]);
        let matches = parse_events(&payload, 0);
        assert_eq!(matches[0].info.away_team, "Orlando Pirates");
        assert_eq!(matches[0].info.league, "unknown");
        assert!(matches[0].observations.is_empty());
    }

    #[test]
    fn events_without_identity_are_dropped() {
        let payload = json!([
            {"commence_time": "2026-10-18T22:00:00Z", "home_team": "A", "away_team": "B"},
            {"id": "e2", "home_team": "A", "away_team": "B"}
        ]);
        assert!(parse_events(&payload, 0).is_empty());
        assert!(parse_events(&json!({"message": "quota exceeded"}), 0).is_empty());
    }

    #[test]
    fn one_failing_league_is_skipped() {
        let ok = parse_events(&sample(), 1);
        let merged = merge_leagues(vec![
            ("soccer_brazil_serieb", Ok(ok)),
            ("soccer_kenya_premier_league", Err(AppError::feed(FEED_NAME, "HTTP 500"))),
        ])
        .expect("partial success");
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].info.match_id, "e912");
    }

    #[test]
    fn every_league_failing_fails_the_feed() {
        let result = merge_leagues(vec![
            ("soccer_brazil_serieb", Err(AppError::feed(FEED_NAME, "HTTP 401"))),
            ("soccer_kenya_premier_league", Err(AppError::feed(FEED_NAME, "HTTP 401"))),
        ]);
        assert!(matches!(result, Err(AppError::Feed { feed: FEED_NAME, .. })));
    }

    #[test]
    fn no_leagues_is_an_empty_success() {
        assert!(merge_leagues(Vec::new()).expect("empty").is_empty());
    }
}
