use crate::config::{DRAW_DROP_THRESHOLD, GOAL_LINE_SHIFT_THRESHOLD};
use crate::types::{MarketKind, MatchTimeline, OddsObservation, OrderingMode};

/// Slack on threshold comparisons so that a move landing exactly on a threshold
/// still counts after float rounding ((2.0 - 1.6) / 2.0 is 0.19999999999999996).
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Thresholds and ordering shared by both rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSettings {
    pub draw_drop_threshold: f64,
    pub goal_line_shift_threshold: f64,
    pub ordering: OrderingMode,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            draw_drop_threshold: DRAW_DROP_THRESHOLD,
            goal_line_shift_threshold: GOAL_LINE_SHIFT_THRESHOLD,
            ordering: OrderingMode::Arrival,
        }
    }
}

/// Draw odds shortened by at least `draw_drop_threshold` between the opening
/// and latest qualifying 1X2 observations.
///
/// `source_filter` restricts the scan to one bookmaker; `None` pools them all.
/// Fewer than two draw prices, a zero opening price, or a price that did not
/// shorten are all negative results.
pub fn detect_draw_drop(
    timeline: &MatchTimeline,
    source_filter: Option<&str>,
    settings: &RuleSettings,
) -> bool {
    let Some((opening, latest)) = opening_and_latest(
        timeline,
        MarketKind::OneXTwo,
        source_filter,
        settings.ordering,
        |o| o.draw,
    ) else {
        return false;
    };

    if opening == 0.0 || latest >= opening {
        return false;
    }

    let drop_ratio = (opening - latest) / opening;
    drop_ratio >= settings.draw_drop_threshold - THRESHOLD_EPSILON
}

/// Over/Under goal line moved by at least `goal_line_shift_threshold` in
/// either direction between the opening and latest qualifying observations.
pub fn detect_goal_line_shift(
    timeline: &MatchTimeline,
    source_filter: Option<&str>,
    settings: &RuleSettings,
) -> bool {
    let Some((opening, latest)) = opening_and_latest(
        timeline,
        MarketKind::OverUnder,
        source_filter,
        settings.ordering,
        |o| o.total_line,
    ) else {
        return false;
    };

    (latest - opening).abs() >= settings.goal_line_shift_threshold - THRESHOLD_EPSILON
}

/// First and last value of `field` across observations of `market`
/// (optionally from one bookmaker). None when fewer than two qualify.
fn opening_and_latest<F>(
    timeline: &MatchTimeline,
    market: MarketKind,
    source_filter: Option<&str>,
    ordering: OrderingMode,
    field: F,
) -> Option<(f64, f64)>
where
    F: Fn(&OddsObservation) -> Option<f64>,
{
    let mut values: Vec<(u64, f64)> = timeline
        .observations
        .iter()
        .filter(|o| o.market == market)
        .filter(|o| source_filter.map_or(true, |s| o.bookmaker == s))
        .filter_map(|o| field(o).map(|v| (o.timestamp_ns, v)))
        .collect();

    if values.len() < 2 {
        return None;
    }

    if ordering == OrderingMode::Timestamp {
        // stable: equal timestamps keep arrival order
        values.sort_by_key(|&(ts, _)| ts);
    }

    let opening = values.first()?.1;
    let latest = values.last()?.1;
    Some((opening, latest))
}
