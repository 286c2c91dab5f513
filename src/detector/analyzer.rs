use tracing::debug;

use crate::config::Config;
use crate::detector::rules::{detect_draw_drop, detect_goal_line_shift, RuleSettings};
use crate::types::{KnownSource, MatchTimeline, SuspicionAlert, UNKNOWN_SOURCE};

/// Turns match timelines into suspicion alerts.
///
/// Stateless apart from its settings: every call is a pure function of the
/// timeline passed in, so one detector can be shared across tasks.
#[derive(Debug, Clone)]
pub struct SuspicionDetector {
    settings: RuleSettings,
    sources: Vec<KnownSource>,
}

impl SuspicionDetector {
    pub fn new(settings: RuleSettings, sources: Vec<KnownSource>) -> Self {
        Self { settings, sources }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            RuleSettings {
                draw_drop_threshold: cfg.draw_drop_threshold,
                goal_line_shift_threshold: cfg.goal_line_shift_threshold,
                ordering: cfg.ordering,
            },
            cfg.alert_sources.clone(),
        )
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    pub fn sources(&self) -> &[KnownSource] {
        &self.sources
    }

    /// Returns an alert when either rule fires on the pooled observations of
    /// all bookmakers.
    ///
    /// Pooling is deliberate: opening and latest may come from different
    /// bookmakers, which is how a market-wide move shows up. The same pooling
    /// means a pattern can exist only across books, in which case no known
    /// source reproduces it and the alert is attributed to `unknown`.
    pub fn analyze_match(&self, timeline: &MatchTimeline) -> Option<SuspicionAlert> {
        let suspicious_draw = detect_draw_drop(timeline, None, &self.settings);
        let goal_line_shift = detect_goal_line_shift(timeline, None, &self.settings);

        if !suspicious_draw && !goal_line_shift {
            return None;
        }

        let alert_sources = self.attribute(timeline);

        debug!(
            match_id = %timeline.info.match_id,
            suspicious_draw,
            goal_line_shift,
            sources = ?alert_sources,
            "match flagged"
        );

        let info = &timeline.info;
        Some(SuspicionAlert {
            match_id: info.match_id.clone(),
            league: info.league.clone(),
            home_team: info.home_team.clone(),
            away_team: info.away_team.clone(),
            commence_time: info.commence_time.clone(),
            suspicious_draw,
            goal_line_shift,
            alert_sources,
        })
    }

    /// Alerts for every timeline that yields one, in input order.
    pub fn analyze_matches<'a, I>(&self, timelines: I) -> Vec<SuspicionAlert>
    where
        I: IntoIterator<Item = &'a MatchTimeline>,
    {
        timelines
            .into_iter()
            .filter_map(|t| self.analyze_match(t))
            .collect()
    }

    /// Per-source re-runs: draw-drop matches first, then goal-line matches,
    /// each in vocabulary order, duplicates suppressed.
    fn attribute(&self, timeline: &MatchTimeline) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();

        for source in &self.sources {
            if tags.contains(&source.tag) {
                continue;
            }
            if detect_draw_drop(timeline, Some(&source.bookmaker), &self.settings) {
                tags.push(source.tag.clone());
            }
        }
        for source in &self.sources {
            if tags.contains(&source.tag) {
                continue;
            }
            if detect_goal_line_shift(timeline, Some(&source.bookmaker), &self.settings) {
                tags.push(source.tag.clone());
            }
        }

        if tags.is_empty() {
            tags.push(UNKNOWN_SOURCE.to_string());
        }
        tags
    }
}

impl Default for SuspicionDetector {
    fn default() -> Self {
        Self::new(
            RuleSettings::default(),
            vec![
                KnownSource::new("OddsAPI", "odds_api"),
                KnownSource::new("Betfair", "betfair"),
                KnownSource::new("Pinnacle", "pinnacle"),
            ],
        )
    }
}
