use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::PinnacleConfig;
use crate::error::{AppError, Result};
use crate::feeds::{f64_field, http_client, id_field, now_ns, str_field};
use crate::types::{FeedMatch, MatchInfo, OddsObservation};

pub const FEED_NAME: &str = "pinnacle";

/// Bookmaker name stamped on every Pinnacle observation.
pub const BOOKMAKER: &str = "Pinnacle";

const SOCCER_SPORT_ID: u32 = 29;

/// Client for the Pinnacle v1 line API (basic auth).
pub struct PinnacleClient {
    cfg: PinnacleConfig,
    client: reqwest::Client,
}

impl PinnacleClient {
    pub fn new(cfg: PinnacleConfig, timeout: Duration) -> Result<Self> {
        Ok(Self { cfg, client: http_client(timeout)? })
    }

    pub async fn fetch(&self) -> Result<Vec<FeedMatch>> {
        let leagues = self.get("leagues", &[]).await?;
        let league_names = select_leagues(&leagues, &self.cfg.leagues);
        if league_names.is_empty() {
            info!("[PINNACLE] none of the {} configured leagues are listed", self.cfg.leagues.len());
            return Ok(Vec::new());
        }

        let ids = league_names.keys().cloned().collect::<Vec<_>>().join(",");
        let fixtures = self.get("fixtures", &[("leagueIds", ids.as_str())]).await?;
        let odds = self
            .get("odds", &[("leagueIds", ids.as_str()), ("oddsFormat", "DECIMAL")])
            .await?;

        let matches = parse_odds(&fixtures, &odds, &league_names, now_ns());
        info!("[PINNACLE] {} matches across {} leagues", matches.len(), league_names.len());
        Ok(matches)
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.cfg.base_url, path);
        let sport_id = SOCCER_SPORT_ID.to_string();
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .basic_auth(&self.cfg.username, Some(&self.cfg.password))
            .query(&[("sportId", sport_id.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if resp.is_null() {
            return Err(AppError::feed(FEED_NAME, format!("{path}: empty response")));
        }
        Ok(resp)
    }
}

/// league id → league name, for the leagues whose lower-cased name is in `wanted`.
/// Accepts both a bare array and a `{"leagues": [...]}` envelope.
pub fn select_leagues(leagues: &serde_json::Value, wanted: &[String]) -> HashMap<String, String> {
    let list = leagues
        .as_array()
        .or_else(|| leagues.get("leagues").and_then(|l| l.as_array()));
    list.into_iter()
        .flatten()
        .filter_map(|l| {
            let name = str_field(l, "name")?;
            if !wanted.iter().any(|w| w == &name.to_lowercase()) {
                return None;
            }
            Some((id_field(l, "id")?, name.to_string()))
        })
        .collect()
}

/// Joins odds events with their fixtures. The full-match period (number 0,
/// or the first period listed) yields a 1X2 observation from its moneyline
/// and one Over/Under observation from its main totals line.
pub fn parse_odds(
    fixtures: &serde_json::Value,
    odds: &serde_json::Value,
    league_names: &HashMap<String, String>,
    taken_at_ns: u64,
) -> Vec<FeedMatch> {
    let fixture_map: HashMap<String, &serde_json::Value> = league_events(fixtures)
        .filter_map(|(_, e)| Some((id_field(e, "id")?, e)))
        .collect();

    let mut matches = Vec::new();
    for (league_id, event) in league_events(odds) {
        let Some(event_id) = id_field(event, "id") else {
            continue;
        };
        let Some(fixture) = fixture_map.get(&event_id) else {
            debug!(event_id = %event_id, "[PINNACLE] odds without fixture");
            continue;
        };
        let (Some(home), Some(away), Some(starts)) = (
            str_field(fixture, "home"),
            str_field(fixture, "away"),
            str_field(fixture, "starts"),
        ) else {
            continue;
        };

        let league = league_id
            .and_then(|id| league_names.get(&id).cloned())
            .unwrap_or_else(|| "Unknown".to_string());

        matches.push(FeedMatch {
            info: MatchInfo {
                match_id: format!("pinnacle_{event_id}"),
                league,
                home_team: home.to_string(),
                away_team: away.to_string(),
                commence_time: starts.to_string(),
            },
            observations: full_match_observations(event, taken_at_ns),
        });
    }
    matches
}

/// (league id, event) pairs from a `{"league": [{"id", "events": [...]}]}` payload.
fn league_events(payload: &serde_json::Value) -> impl Iterator<Item = (Option<String>, &serde_json::Value)> {
    payload
        .get("league")
        .and_then(|l| l.as_array())
        .into_iter()
        .flatten()
        .flat_map(|league| {
            let league_id = id_field(league, "id");
            league
                .get("events")
                .and_then(|e| e.as_array())
                .into_iter()
                .flatten()
                .map(move |e| (league_id.clone(), e))
        })
}

fn full_match_observations(event: &serde_json::Value, taken_at_ns: u64) -> Vec<OddsObservation> {
    let Some(periods) = event.get("periods").and_then(|p| p.as_array()) else {
        return Vec::new();
    };
    let Some(period) = periods
        .iter()
        .find(|p| p.get("number").and_then(|n| n.as_i64()) == Some(0))
        .or_else(|| periods.first())
    else {
        return Vec::new();
    };

    let mut observations = Vec::new();
    if let Some(moneyline) = period.get("moneyline") {
        observations.push(OddsObservation::one_x_two(
            BOOKMAKER,
            taken_at_ns,
            f64_field(moneyline, "home"),
            f64_field(moneyline, "draw"),
            f64_field(moneyline, "away"),
        ));
    }
    if let Some(line) = main_totals_line(period) {
        observations.push(OddsObservation::over_under(
            BOOKMAKER,
            taken_at_ns,
            f64_field(line, "points"),
            f64_field(line, "over"),
            f64_field(line, "under"),
        ));
    }
    observations
}

/// The totals entry without an `altLineId`, else the first one listed.
fn main_totals_line(period: &serde_json::Value) -> Option<&serde_json::Value> {
    let totals = period.get("totals")?.as_array()?;
    totals
        .iter()
        .find(|t| t.get("altLineId").map_or(true, |id| id.is_null()))
        .or_else(|| totals.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::SuspicionDetector;
    use crate::state::TimelineStore;
    use crate::types::MarketKind;
    use serde_json::json;

    fn names() -> HashMap<String, String> {
        HashMap::from([("1844".to_string(), "Kenya - Premier League".to_string())])
    }

    fn fixtures() -> serde_json::Value {
        json!({"league": [{"id": 1844, "events": [
            {"id": 1501, "home": "Tusker", "away": "Bandari", "starts": "2026-10-18T12:00:00Z"}
        ]}]})
    }

    #[test]
    fn leagues_are_matched_case_insensitively() {
        let leagues = json!({"leagues": [
            {"id": 1844, "name": "Kenya - Premier League"},
            {"id": 1980, "name": "England - Premier League"}
        ]});
        let wanted = vec!["kenya - premier league".to_string()];
        let selected = select_leagues(&leagues, &wanted);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.get("1844").map(String::as_str), Some("Kenya - Premier League"));
    }

    #[test]
    fn full_match_period_yields_moneyline_and_totals() {
        let odds = json!({"league": [{"id": 1844, "events": [{
            "id": 1501,
            "periods": [
                {"number": 1, "moneyline": {"home": 2.9, "draw": 2.0, "away": 4.0}},
                {"number": 0,
                 "moneyline": {"home": 2.2, "draw": 3.1, "away": 3.4},
                 "totals": [
                    {"altLineId": 9001, "points": 2.25, "over": 1.95, "under": 1.9},
                    {"points": 2.5, "over": 2.2, "under": 1.7}
                 ]}
            ]
        }]}]});

        let matches = parse_odds(&fixtures(), &odds, &names(), 5);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.info.match_id, "pinnacle_1501");
        assert_eq!(m.info.league, "Kenya - Premier League");
        assert_eq!(m.info.home_team, "Tusker");
        assert_eq!(m.observations.len(), 2);

        let ml = &m.observations[0];
        assert_eq!(ml.market, MarketKind::OneXTwo);
        assert_eq!(ml.draw, Some(3.1));
        assert_eq!(ml.bookmaker, BOOKMAKER);

        let ou = &m.observations[1];
        assert_eq!(ou.market, MarketKind::OverUnder);
        assert_eq!(ou.total_line, Some(2.5));
        assert_eq!(ou.over, Some(2.2));
    }

    #[test]
    fn alternate_lines_in_one_poll_are_not_a_goal_line_shift() {
        let odds = json!({"league": [{"id": 1844, "events": [{
            "id": 1501,
            "periods": [{"number": 0, "totals": [
                {"altLineId": 11, "points": 1.5, "over": 1.3, "under": 3.4},
                {"points": 2.5, "over": 1.9, "under": 1.95},
                {"altLineId": 12, "points": 3.5, "over": 3.1, "under": 1.35}
            ]}]
        }]}]});

        let matches = parse_odds(&fixtures(), &odds, &names(), 5);
        let totals: Vec<Option<f64>> = matches[0]
            .observations
            .iter()
            .filter(|o| o.market == MarketKind::OverUnder)
            .map(|o| o.total_line)
            .collect();
        assert_eq!(totals, vec![Some(2.5)]);

        let store = TimelineStore::new();
        for m in matches {
            store.ingest(m);
        }
        assert!(SuspicionDetector::default().analyze_matches(&store.snapshot()).is_empty());
    }

    #[test]
    fn first_totals_entry_is_used_when_all_are_alternates() {
        let odds = json!({"league": [{"id": 1844, "events": [{
            "id": 1501,
            "periods": [{"number": 0, "totals": [
                {"altLineId": 11, "points": 2.75, "over": 2.0, "under": 1.85},
                {"altLineId": 12, "points": 3.0, "over": 2.3, "under": 1.6}
            ]}]
        }]}]});

        let matches = parse_odds(&fixtures(), &odds, &names(), 5);
        assert_eq!(matches[0].observations.len(), 1);
        assert_eq!(matches[0].observations[0].total_line, Some(2.75));
    }

    #[test]
    fn odds_without_fixture_are_skipped() {
        let odds = json!({"league": [{"id": 1844, "events": [{"id": 777, "periods": []}]}]});
        assert!(parse_odds(&fixtures(), &odds, &names(), 0).is_empty());
    }
}
