mod config;
mod detector;
mod error;
mod feeds;
mod metrics;
mod monitor;
mod notifier;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::detector::SuspicionDetector;
use crate::error::Result;
use crate::feeds::feeds_from_config;
use crate::monitor::Monitor;
use crate::notifier::{render, LogNotifier};
use crate::state::{AlertStore, TimelineStore};

/// Number of alerts listed in the shutdown report.
const REPORT_ALERT_LIMIT: usize = 20;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let feeds = feeds_from_config(&cfg)?;
    if feeds.is_empty() {
        warn!("No feeds configured: set ODDS_API_KEY, BETFAIR_APP_KEY/BETFAIR_SESSION_TOKEN or PINNACLE_USERNAME/PINNACLE_PASSWORD");
    } else {
        let names: Vec<&str> = feeds.iter().map(|f| f.name()).collect();
        info!("Feeds enabled: {}", names.join(", "));
    }

    let detector = SuspicionDetector::from_config(&cfg);
    let settings = detector.settings();
    let tags: Vec<String> = detector
        .sources()
        .iter()
        .map(|s| format!("{}={}", s.bookmaker, s.tag))
        .collect();
    info!(
        "Detector ready: draw_drop>={:.2} goal_line_shift>={:.2} ordering={} sources=[{}]",
        settings.draw_drop_threshold,
        settings.goal_line_shift_threshold,
        settings.ordering,
        tags.join(", "),
    );

    let timelines = TimelineStore::new();
    let alerts = AlertStore::new();

    let monitor = Monitor::new(
        feeds,
        detector,
        Arc::clone(&timelines),
        Arc::clone(&alerts),
        Arc::new(LogNotifier),
        cfg.monitor_interval_secs,
    );
    info!("Monitoring every {}s", cfg.monitor_interval_secs);
    let handle = tokio::spawn(async move { monitor.run().await });

    tokio::signal::ctrl_c().await?;
    handle.abort();

    info!(
        "Shutting down | {} matches, {} observations, {} alerts",
        timelines.match_count(),
        timelines.observation_count(),
        alerts.len(),
    );
    for stored in alerts.recent(REPORT_ALERT_LIMIT) {
        info!("[REPORT] {}", render(&stored.alert));
    }

    Ok(())
}
