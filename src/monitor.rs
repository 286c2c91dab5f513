use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::detector::SuspicionDetector;
use crate::feeds::{now_ns, Feed};
use crate::metrics::PassLatency;
use crate::notifier::Notifier;
use crate::state::{AlertStore, TimelineStore};

/// Counters for one monitoring pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub observations_ingested: usize,
    /// Matches analyzed this pass.
    pub matches_tracked: usize,
    /// Matches dropped after this pass because they kicked off.
    pub matches_expired: usize,
    /// Alerts produced by the detector this pass, including repeats.
    pub alerts_raised: usize,
    /// Alerts stored and notified for the first time.
    pub alerts_new: usize,
}

/// Scheduled fetch → ingest → detect → store → notify loop.
pub struct Monitor {
    feeds: Vec<Feed>,
    detector: SuspicionDetector,
    timelines: Arc<TimelineStore>,
    alerts: Arc<AlertStore>,
    notifier: Arc<dyn Notifier>,
    latency: PassLatency,
    interval_secs: u64,
}

impl Monitor {
    pub fn new(
        feeds: Vec<Feed>,
        detector: SuspicionDetector,
        timelines: Arc<TimelineStore>,
        alerts: Arc<AlertStore>,
        notifier: Arc<dyn Notifier>,
        interval_secs: u64,
    ) -> Self {
        Self {
            feeds,
            detector,
            timelines,
            alerts,
            notifier,
            latency: PassLatency::new(),
            interval_secs,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        loop {
            // first tick fires immediately
            ticker.tick().await;
            self.run_pass().await;
        }
    }

    pub async fn run_pass(&self) -> PassSummary {
        let started = Instant::now();
        let mut summary = PassSummary::default();

        let results = join_all(self.feeds.iter().map(|feed| feed.fetch())).await;
        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(matches) => {
                    summary.feeds_ok += 1;
                    for m in matches {
                        summary.observations_ingested += self.timelines.ingest(m);
                    }
                }
                Err(e) => {
                    summary.feeds_failed += 1;
                    error!(feed = feed.name(), "Feed poll failed: {e}");
                }
            }
        }

        let now = now_ns();
        summary.matches_tracked = self.timelines.match_count();
        let (raised, new) = self.detect_and_record(now);
        summary.alerts_raised = raised;
        summary.alerts_new = new;
        // started matches get one last analysis above, then leave the store
        summary.matches_expired = self.timelines.retain_upcoming(now);

        self.latency.record(started.elapsed());
        self.log_summary(&summary, started.elapsed());
        summary
    }

    /// Runs the detector over a snapshot of every timeline, stores alerts for
    /// matches not alerted before and notifies those.
    /// Returns (alerts raised, alerts new).
    pub fn detect_and_record(&self, created_at_ns: u64) -> (usize, usize) {
        let snapshot = self.timelines.snapshot();
        let alerts = self.detector.analyze_matches(&snapshot);
        let raised = alerts.len();

        let mut new = 0;
        for alert in alerts {
            if !self.alerts.insert_if_absent(alert.clone(), created_at_ns) {
                continue;
            }
            new += 1;
            self.notifier.notify(&alert);
        }
        (raised, new)
    }

    fn log_summary(&self, s: &PassSummary, elapsed: Duration) {
        let (p50, p99) = self.latency.percentiles();
        if s.alerts_new > 0 {
            warn!(
                event = "PASS",
                new_alerts = s.alerts_new,
                "Found {} new suspicious fixtures ({} flagged this pass)",
                s.alerts_new,
                s.alerts_raised,
            );
        }
        info!(
            event = "PASS",
            feeds_ok = s.feeds_ok,
            feeds_failed = s.feeds_failed,
            observations = s.observations_ingested,
            matches = s.matches_tracked,
            expired = s.matches_expired,
            flagged = s.alerts_raised,
            new_alerts = s.alerts_new,
            total_alerts = self.alerts.len(),
            passes = self.latency.len(),
            "Pass complete in {}ms | feeds ok={} failed={} | +{} observations | {} matches, {} expired | {} flagged, {} new | p50={}ms p99={}ms",
            elapsed.as_millis(),
            s.feeds_ok,
            s.feeds_failed,
            s.observations_ingested,
            s.matches_tracked,
            s.matches_expired,
            s.alerts_raised,
            s.alerts_new,
            p50.unwrap_or(0),
            p99.unwrap_or(0),
        );
    }
}
