use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source tag used when a general flag fires but no single known source
/// reproduces it on its own observations.
pub const UNKNOWN_SOURCE: &str = "unknown";

// ---------------------------------------------------------------------------
// Odds observations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketKind {
    #[serde(rename = "1X2")]
    OneXTwo,
    #[serde(rename = "Over/Under")]
    OverUnder,
}

/// One bookmaker's quoted prices for one market on one match at one point in time.
/// Decimal odds; any side the bookmaker did not quote is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsObservation {
    pub market: MarketKind,
    pub bookmaker: String,
    /// Nanosecond UTC epoch at which the snapshot was taken.
    pub timestamp_ns: u64,
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    pub total_line: Option<f64>,
    pub over: Option<f64>,
    pub under: Option<f64>,
}

impl OddsObservation {
    pub fn one_x_two(
        bookmaker: impl Into<String>,
        timestamp_ns: u64,
        home: Option<f64>,
        draw: Option<f64>,
        away: Option<f64>,
    ) -> Self {
        Self {
            market: MarketKind::OneXTwo,
            bookmaker: bookmaker.into(),
            timestamp_ns,
            home,
            draw,
            away,
            total_line: None,
            over: None,
            under: None,
        }
    }

    pub fn over_under(
        bookmaker: impl Into<String>,
        timestamp_ns: u64,
        total_line: Option<f64>,
        over: Option<f64>,
        under: Option<f64>,
    ) -> Self {
        Self {
            market: MarketKind::OverUnder,
            bookmaker: bookmaker.into(),
            timestamp_ns,
            home: None,
            draw: None,
            away: None,
            total_line,
            over,
            under,
        }
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// Kickoff as an RFC 3339 string, exactly as the feed reported it.
    pub commence_time: String,
}

impl MatchInfo {
    /// Kickoff as a nanosecond UTC epoch, `None` when the feed's string is
    /// not RFC 3339.
    pub fn kickoff_ns(&self) -> Option<u64> {
        let kickoff = DateTime::parse_from_rfc3339(&self.commence_time).ok()?;
        let ns = kickoff.with_timezone(&Utc).timestamp_nanos_opt()?;
        u64::try_from(ns).ok()
    }
}

/// A match plus every observation received for it.
/// `observations` is in arrival order; nothing re-sorts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTimeline {
    pub info: MatchInfo,
    pub observations: Vec<OddsObservation>,
}

impl MatchTimeline {
    pub fn new(info: MatchInfo) -> Self {
        Self { info, observations: Vec::new() }
    }
}

/// One match as normalized by a feed client during a single poll.
#[derive(Debug, Clone)]
pub struct FeedMatch {
    pub info: MatchInfo,
    pub observations: Vec<OddsObservation>,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// How the detector picks "opening" and "latest" out of the qualifying values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    /// First and last by arrival (insertion) order.
    Arrival,
    /// First and last after a stable sort on `timestamp_ns`.
    Timestamp,
}

impl std::fmt::Display for OrderingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingMode::Arrival => write!(f, "arrival"),
            OrderingMode::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl std::str::FromStr for OrderingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrival" => Ok(OrderingMode::Arrival),
            "timestamp" => Ok(OrderingMode::Timestamp),
            other => Err(format!("unknown ordering mode '{other}' (expected arrival|timestamp)")),
        }
    }
}

/// A bookmaker the detector attributes alerts to.
/// `bookmaker` is matched exactly against `OddsObservation::bookmaker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSource {
    pub bookmaker: String,
    pub tag: String,
}

impl KnownSource {
    pub fn new(bookmaker: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { bookmaker: bookmaker.into(), tag: tag.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionAlert {
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    pub suspicious_draw: bool,
    pub goal_line_shift: bool,
    /// Never empty: falls back to [`UNKNOWN_SOURCE`].
    pub alert_sources: Vec<String>,
}
