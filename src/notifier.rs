use tracing::warn;

use crate::types::SuspicionAlert;

/// Receives every newly stored alert. Delivery is fire-and-forget; the
/// monitor does not look at the outcome.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &SuspicionAlert);
}

/// Emits each alert as a single structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &SuspicionAlert) {
        warn!(
            event = "SUSPICIOUS_MATCH",
            match_id = %alert.match_id,
            league = %alert.league,
            suspicious_draw = alert.suspicious_draw,
            goal_line_shift = alert.goal_line_shift,
            "{}",
            render(alert),
        );
    }
}

/// One-line human summary of an alert.
pub fn render(alert: &SuspicionAlert) -> String {
    format!(
        "SUSPICIOUS MATCH | {} | {} vs {} | kickoff {} | draw drop: {} | goal line shift: {} | sources: {}",
        alert.league,
        alert.home_team,
        alert.away_team,
        alert.commence_time,
        yes_no(alert.suspicious_draw),
        yes_no(alert.goal_line_shift),
        alert.alert_sources.join(", "),
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_flags_and_sources() {
        let alert = SuspicionAlert {
            match_id: "m1".to_string(),
            league: "soccer_south_africa_psl".to_string(),
            home_team: "Kaizer Chiefs".to_string(),
            away_team: "Orlando Pirates".to_string(),
            commence_time: "2026-10-18T15:30:00Z".to_string(),
            suspicious_draw: true,
            goal_line_shift: false,
            alert_sources: vec!["betfair".to_string(), "pinnacle".to_string()],
        };
        assert_eq!(
            render(&alert),
            "SUSPICIOUS MATCH | soccer_south_africa_psl | Kaizer Chiefs vs Orlando Pirates | \
             kickoff 2026-10-18T15:30:00Z | draw drop: YES | goal line shift: NO | sources: betfair, pinnacle"
        );
    }
}
