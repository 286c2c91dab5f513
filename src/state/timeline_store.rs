use std::sync::Arc;

use dashmap::DashMap;

use crate::types::{FeedMatch, MatchTimeline};

/// Accumulated odds history for every match seen by any feed.
///
/// Observations are only ever appended, in the order feeds deliver them,
/// and only while the match is pre-match. The detector never reads this map directly; it works on [`snapshot`]
/// clones so ingestion can keep appending while a pass runs.
///
/// [`snapshot`]: TimelineStore::snapshot
pub struct TimelineStore {
    /// match_id → timeline
    timelines: DashMap<String, MatchTimeline>,
}

impl TimelineStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { timelines: DashMap::new() })
    }

    /// Appends a feed's observations to the match, creating it on first sight.
    /// Observations taken at or after kickoff are in-play prices and are
    /// dropped. Returns the number of observations appended.
    ///
    /// Match metadata from the first feed that reported the match is kept.
    pub fn ingest(&self, feed_match: FeedMatch) -> usize {
        let FeedMatch { info, mut observations } = feed_match;
        if let Some(kickoff) = info.kickoff_ns() {
            observations.retain(|o| o.timestamp_ns < kickoff);
            if observations.is_empty() {
                return 0;
            }
        }
        let appended = observations.len();
        let mut entry = self
            .timelines
            .entry(info.match_id.clone())
            .or_insert_with(|| MatchTimeline::new(info));
        entry.observations.extend(observations);
        appended
    }

    /// Drops every match that has kicked off by `now_ns`. Matches whose
    /// kickoff cannot be parsed are kept. Returns the number dropped.
    pub fn retain_upcoming(&self, now_ns: u64) -> usize {
        let before = self.timelines.len();
        self.timelines
            .retain(|_, t| t.info.kickoff_ns().map_or(true, |kickoff| kickoff > now_ns));
        before.saturating_sub(self.timelines.len())
    }

    /// Owned copies of every timeline, ordered by kickoff then match id so
    /// that detection output is deterministic.
    pub fn snapshot(&self) -> Vec<MatchTimeline> {
        let mut all: Vec<MatchTimeline> = self.timelines.iter().map(|t| t.value().clone()).collect();
        all.sort_by(|a, b| {
            a.info
                .commence_time
                .cmp(&b.info.commence_time)
                .then_with(|| a.info.match_id.cmp(&b.info.match_id))
        });
        all
    }

    pub fn match_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn observation_count(&self) -> usize {
        self.timelines.iter().map(|t| t.observations.len()).sum()
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self { timelines: DashMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchInfo, OddsObservation};

    fn feed_match(id: &str, kickoff: &str, draws: &[f64]) -> FeedMatch {
        FeedMatch {
            info: MatchInfo {
                match_id: id.to_string(),
                league: "soccer_nigeria_pfl".to_string(),
                home_team: "Enyimba".to_string(),
                away_team: "Rivers United".to_string(),
                commence_time: kickoff.to_string(),
            },
            observations: draws
                .iter()
                .map(|&d| OddsObservation::one_x_two("Betfair", 0, None, Some(d), None))
                .collect(),
        }
    }

    fn find(store: &TimelineStore, id: &str) -> Option<MatchTimeline> {
        store.snapshot().into_iter().find(|t| t.info.match_id == id)
    }

    #[test]
    fn ingest_appends_in_arrival_order() {
        let store = TimelineStore::new();
        assert_eq!(store.ingest(feed_match("m1", "2026-10-18T15:00:00Z", &[3.0, 2.9])), 2);
        assert_eq!(store.ingest(feed_match("m1", "2026-10-18T15:00:00Z", &[2.1])), 1);

        let t = find(&store, "m1").expect("timeline");
        let draws: Vec<Option<f64>> = t.observations.iter().map(|o| o.draw).collect();
        assert_eq!(draws, vec![Some(3.0), Some(2.9), Some(2.1)]);
        assert_eq!(store.match_count(), 1);
        assert_eq!(store.observation_count(), 3);
    }

    #[test]
    fn first_reported_metadata_is_kept() {
        let store = TimelineStore::new();
        store.ingest(feed_match("m1", "2026-10-18T15:00:00Z", &[3.0]));
        let mut later = feed_match("m1", "2026-10-19T15:00:00Z", &[2.0]);
        later.info.league = "renamed".to_string();
        store.ingest(later);
        let t = find(&store, "m1").expect("timeline");
        assert_eq!(t.info.league, "soccer_nigeria_pfl");
        assert_eq!(t.info.commence_time, "2026-10-18T15:00:00Z");
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let store = TimelineStore::new();
        store.ingest(feed_match("b", "2026-10-19T12:00:00Z", &[3.0]));
        store.ingest(feed_match("c", "2026-10-18T12:00:00Z", &[3.0]));
        store.ingest(feed_match("a", "2026-10-19T12:00:00Z", &[3.0]));

        let snap = store.snapshot();
        let ids: Vec<&str> = snap.iter().map(|t| t.info.match_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        store.ingest(feed_match("c", "2026-10-18T12:00:00Z", &[2.0]));
        assert_eq!(snap[0].observations.len(), 1);
        assert_eq!(find(&store, "c").map(|t| t.observations.len()), Some(2));
    }

    fn observed_at(id: &str, kickoff: &str, stamps: &[u64]) -> FeedMatch {
        let mut m = feed_match(id, kickoff, &[]);
        m.observations = stamps
            .iter()
            .map(|&ts| OddsObservation::one_x_two("Pinnacle", ts, None, Some(3.0), None))
            .collect();
        m
    }

    // 1970-01-01T00:00:10Z
    const KICKOFF_NS: u64 = 10_000_000_000;

    #[test]
    fn in_play_observations_are_not_ingested() {
        let store = TimelineStore::new();
        let appended = store.ingest(observed_at(
            "m1",
            "1970-01-01T00:00:10Z",
            &[KICKOFF_NS - 1, KICKOFF_NS, KICKOFF_NS + 1],
        ));
        assert_eq!(appended, 1);
        let stamps: Vec<u64> = find(&store, "m1")
            .expect("timeline")
            .observations
            .iter()
            .map(|o| o.timestamp_ns)
            .collect();
        assert_eq!(stamps, vec![KICKOFF_NS - 1]);

        // a match first seen in play is never created
        assert_eq!(store.ingest(observed_at("m2", "1970-01-01T00:00:10Z", &[KICKOFF_NS + 5])), 0);
        assert!(find(&store, "m2").is_none());
    }

    #[test]
    fn retain_upcoming_drops_started_matches() {
        let store = TimelineStore::new();
        store.ingest(observed_at("started", "1970-01-01T00:00:10Z", &[1]));
        store.ingest(observed_at("upcoming", "1970-01-01T00:00:20Z", &[1]));
        store.ingest(observed_at("undated", "kickoff TBC", &[1]));

        assert_eq!(store.retain_upcoming(KICKOFF_NS), 1);
        let ids: Vec<String> = store.snapshot().into_iter().map(|t| t.info.match_id).collect();
        assert_eq!(ids, vec!["upcoming", "undated"]);
        assert_eq!(store.retain_upcoming(KICKOFF_NS), 0);
    }
}
