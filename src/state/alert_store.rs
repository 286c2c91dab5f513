use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::types::SuspicionAlert;

#[derive(Debug, Clone, Serialize)]
pub struct StoredAlert {
    pub alert: SuspicionAlert,
    /// Nanosecond UTC epoch of the pass that first raised the alert.
    pub created_at_ns: u64,
}

/// Alerts already raised, one per match. Later passes that flag the same
/// match again are dropped here, so each match is notified once.
pub struct AlertStore {
    /// match_id → first alert raised for it
    alerts: DashMap<String, StoredAlert>,
}

impl AlertStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { alerts: DashMap::new() })
    }

    /// Stores the alert unless one already exists for the match.
    /// Returns true when the alert is new.
    pub fn insert_if_absent(&self, alert: SuspicionAlert, created_at_ns: u64) -> bool {
        match self.alerts.entry(alert.match_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(StoredAlert { alert, created_at_ns });
                true
            }
        }
    }

    /// Up to `limit` alerts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<StoredAlert> {
        let mut all: Vec<StoredAlert> = self.alerts.iter().map(|a| a.value().clone()).collect();
        all.sort_by(|a, b| {
            b.created_at_ns
                .cmp(&a.created_at_ns)
                .then_with(|| a.alert.match_id.cmp(&b.alert.match_id))
        });
        all.truncate(limit);
        all
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self { alerts: DashMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str, sources: &[&str]) -> SuspicionAlert {
        SuspicionAlert {
            match_id: id.to_string(),
            league: "soccer_ghana_premier_league".to_string(),
            home_team: "Hearts of Oak".to_string(),
            away_team: "Asante Kotoko".to_string(),
            commence_time: "2026-10-18T15:00:00Z".to_string(),
            suspicious_draw: true,
            goal_line_shift: false,
            alert_sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn second_alert_for_same_match_is_dropped() {
        let store = AlertStore::new();
        assert!(store.insert_if_absent(alert("m1", &["betfair"]), 10));
        assert!(!store.insert_if_absent(alert("m1", &["pinnacle"]), 20));
        assert_eq!(store.len(), 1);

        let stored = store.recent(10).pop().expect("stored");
        assert_eq!(stored.alert.alert_sources, vec!["betfair"]);
        assert_eq!(stored.created_at_ns, 10);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let store = AlertStore::new();
        store.insert_if_absent(alert("old", &["unknown"]), 1);
        store.insert_if_absent(alert("new", &["betfair"]), 3);
        store.insert_if_absent(alert("mid", &["pinnacle"]), 2);

        let ids: Vec<String> = store.recent(2).into_iter().map(|a| a.alert.match_id).collect();
        assert_eq!(ids, vec!["new", "mid"]);
        assert!(store.recent(0).is_empty());
    }
}
