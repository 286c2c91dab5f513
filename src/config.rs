use crate::error::{AppError, Result};
use crate::types::{KnownSource, OrderingMode};

pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4/sports";
pub const BETFAIR_API_URL: &str = "https://api.betfair.com/exchange/betting/rest/v1.0";
pub const PINNACLE_API_URL: &str = "https://api.pinnacle.com/v1";

/// Fractional drop in draw odds (opening → latest) that flags a match.
pub const DRAW_DROP_THRESHOLD: f64 = 0.20;

/// Absolute move of the Over/Under goal line (opening → latest) that flags a match.
pub const GOAL_LINE_SHIFT_THRESHOLD: f64 = 1.0;

/// Monitoring pass interval (seconds).
pub const MONITOR_INTERVAL_SECS: u64 = 300;

/// Per-request timeout for feed clients (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default source vocabulary, in attribution order.
pub const DEFAULT_ALERT_SOURCES: &str = "OddsAPI=odds_api,Betfair=betfair,Pinnacle=pinnacle";

pub const ODDS_API_REGIONS: &str = "eu,uk";

pub const DEFAULT_ODDS_API_LEAGUES: &[&str] = &[
    "soccer_brazil_serieb",
    "soccer_brazil_seriec",
    "soccer_argentina_primera_b_nacional",
    "soccer_iran_persian_gulf_pro_league",
    "soccer_nigeria_pfl",
    "soccer_south_africa_psl",
    "soccer_kenya_premier_league",
    "soccer_ghana_premier_league",
    "soccer_zimbabwe_premier_league",
];

/// Pinnacle league names are matched lower-cased.
pub const DEFAULT_PINNACLE_LEAGUES: &[&str] = &[
    "brazil - serie b",
    "brazil - serie c",
    "argentina - primera b nacional",
    "iran - persian gulf pro league",
    "nigeria - pfl",
    "south africa - psl",
    "kenya - premier league",
    "ghana - premier league",
    "zimbabwe - premier league",
];

#[derive(Debug, Clone)]
pub struct OddsApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub regions: String,
    pub leagues: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BetfairConfig {
    pub app_key: String,
    pub session_token: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct PinnacleConfig {
    pub username: String,
    pub password: String,
    pub base_url: String,
    pub leagues: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub monitor_interval_secs: u64,
    pub http_timeout_secs: u64,
    /// DRAW_DROP_THRESHOLD, a ratio in (0, 1]
    pub draw_drop_threshold: f64,
    /// GOAL_LINE_SHIFT_THRESHOLD, goals, > 0
    pub goal_line_shift_threshold: f64,
    /// DETECTOR_ORDERING: arrival | timestamp
    pub ordering: OrderingMode,
    /// ALERT_SOURCES, "Bookmaker=tag" pairs in attribution order
    pub alert_sources: Vec<KnownSource>,
    /// None unless ODDS_API_KEY is set
    pub odds_api: Option<OddsApiConfig>,
    /// None unless both BETFAIR_APP_KEY and BETFAIR_SESSION_TOKEN are set
    pub betfair: Option<BetfairConfig>,
    /// None unless both PINNACLE_USERNAME and PINNACLE_PASSWORD are set
    pub pinnacle: Option<PinnacleConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let draw_drop_threshold = parse_env_f64("DRAW_DROP_THRESHOLD", DRAW_DROP_THRESHOLD)?;
        if !(draw_drop_threshold > 0.0 && draw_drop_threshold <= 1.0) {
            return Err(AppError::Config(
                "DRAW_DROP_THRESHOLD must be in (0, 1]".to_string(),
            ));
        }
        let goal_line_shift_threshold =
            parse_env_f64("GOAL_LINE_SHIFT_THRESHOLD", GOAL_LINE_SHIFT_THRESHOLD)?;
        if !(goal_line_shift_threshold > 0.0) {
            return Err(AppError::Config(
                "GOAL_LINE_SHIFT_THRESHOLD must be positive".to_string(),
            ));
        }

        let ordering = std::env::var("DETECTOR_ORDERING")
            .unwrap_or_else(|_| "arrival".to_string())
            .parse::<OrderingMode>()
            .map_err(AppError::Config)?;

        let alert_sources = parse_alert_sources(
            &std::env::var("ALERT_SOURCES").unwrap_or_else(|_| DEFAULT_ALERT_SOURCES.to_string()),
        )?;

        let odds_api = non_empty_env("ODDS_API_KEY").map(|api_key| OddsApiConfig {
            api_key,
            base_url: std::env::var("ODDS_API_URL").unwrap_or_else(|_| ODDS_API_URL.to_string()),
            regions: std::env::var("ODDS_API_REGIONS")
                .unwrap_or_else(|_| ODDS_API_REGIONS.to_string()),
            leagues: list_env("ODDS_API_LEAGUES", DEFAULT_ODDS_API_LEAGUES),
        });

        let betfair = match (non_empty_env("BETFAIR_APP_KEY"), non_empty_env("BETFAIR_SESSION_TOKEN")) {
            (Some(app_key), Some(session_token)) => Some(BetfairConfig {
                app_key,
                session_token,
                base_url: std::env::var("BETFAIR_API_URL")
                    .unwrap_or_else(|_| BETFAIR_API_URL.to_string()),
            }),
            _ => None,
        };

        let pinnacle = match (non_empty_env("PINNACLE_USERNAME"), non_empty_env("PINNACLE_PASSWORD")) {
            (Some(username), Some(password)) => Some(PinnacleConfig {
                username,
                password,
                base_url: std::env::var("PINNACLE_API_URL")
                    .unwrap_or_else(|_| PINNACLE_API_URL.to_string()),
                leagues: list_env("PINNACLE_LEAGUES", DEFAULT_PINNACLE_LEAGUES)
                    .into_iter()
                    .map(|l| l.to_lowercase())
                    .collect(),
            }),
            _ => None,
        };

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            monitor_interval_secs: std::env::var("MONITOR_INTERVAL_SECS")
                .unwrap_or_else(|_| MONITOR_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("MONITOR_INTERVAL_SECS must be an integer".to_string()))?
                .max(1),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            draw_drop_threshold,
            goal_line_shift_threshold,
            ordering,
            alert_sources,
            odds_api,
            betfair,
            pinnacle,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_f64(key: &str, default: f64) -> Result<f64> {
    match non_empty_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got '{raw}'"))),
    }
}

fn list_env(key: &str, default: &[&str]) -> Vec<String> {
    match non_empty_env(key) {
        Some(raw) => split_list(&raw),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `"OddsAPI=odds_api,Betfair=betfair"` into an ordered vocabulary.
/// Duplicate tags are rejected, as is the reserved `unknown` tag.
pub fn parse_alert_sources(raw: &str) -> Result<Vec<KnownSource>> {
    let mut sources: Vec<KnownSource> = Vec::new();
    for entry in split_list(raw) {
        let Some((bookmaker, tag)) = entry.split_once('=') else {
            return Err(AppError::Config(format!(
                "ALERT_SOURCES entry '{entry}' must look like Bookmaker=tag"
            )));
        };
        let (bookmaker, tag) = (bookmaker.trim(), tag.trim());
        if bookmaker.is_empty() || tag.is_empty() {
            return Err(AppError::Config(format!("ALERT_SOURCES entry '{entry}' is incomplete")));
        }
        if tag == crate::types::UNKNOWN_SOURCE {
            return Err(AppError::Config(format!(
                "ALERT_SOURCES tag '{tag}' is reserved"
            )));
        }
        if sources.iter().any(|s| s.tag == tag) {
            return Err(AppError::Config(format!("ALERT_SOURCES tag '{tag}' appears twice")));
        }
        sources.push(KnownSource::new(bookmaker, tag));
    }
    if sources.is_empty() {
        return Err(AppError::Config("ALERT_SOURCES must name at least one source".to_string()));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sources_keep_attribution_order() {
        let sources = parse_alert_sources(DEFAULT_ALERT_SOURCES).unwrap();
        let tags: Vec<&str> = sources.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["odds_api", "betfair", "pinnacle"]);
        assert_eq!(sources[1].bookmaker, "Betfair");
    }

    #[test]
    fn sources_tolerate_whitespace_and_trailing_commas() {
        let sources = parse_alert_sources(" Smarkets = smarkets , Betfair=betfair,").unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], KnownSource::new("Smarkets", "smarkets"));
    }

    #[test]
    fn malformed_sources_are_rejected() {
        assert!(parse_alert_sources("Betfair").is_err());
        assert!(parse_alert_sources("=betfair").is_err());
        assert!(parse_alert_sources("Betfair=betfair,Other=betfair").is_err());
        assert!(parse_alert_sources("Mystery=unknown").is_err());
        assert!(parse_alert_sources(" , ").is_err());
    }

    #[test]
    fn ordering_mode_parses_case_insensitively() {
        assert_eq!("Arrival".parse::<OrderingMode>(), Ok(OrderingMode::Arrival));
        assert_eq!(" timestamp ".parse::<OrderingMode>(), Ok(OrderingMode::Timestamp));
        assert!("sorted".parse::<OrderingMode>().is_err());
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
    }
}
