//! In-memory latency histogram for monitoring passes.
//! Records wall time from the start of a fetch to the last notification.

use std::sync::Mutex;
use std::time::Duration;

/// Values stored in milliseconds.
pub struct PassLatency {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl PassLatency {
    /// Tracks 1ms to 1h, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000, 3)
            .expect("valid histogram bounds");
        Self { inner: Mutex::new(histogram) }
    }

    pub fn record(&self, d: Duration) {
        let ms = d.as_millis().clamp(1, 3_600_000) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(ms);
        }
    }

    /// (p50_ms, p99_ms). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None);
        };
        if h.len() == 0 {
            return (None, None);
        }
        (Some(h.value_at_quantile(0.5)), Some(h.value_at_quantile(0.99)))
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for PassLatency {
    fn default() -> Self {
        Self::new()
    }
}
