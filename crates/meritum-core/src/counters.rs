//! Keyed award counters with a sliding expiry window.
//!
//! Injected into the award processor instead of living as process-lifetime
//! globals, so tests can scope and reset them. The configured abuse
//! thresholds are observed and logged, not enforced; see DESIGN.md for the
//! open policy question.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Advisory award limits
#[derive(Debug, Clone, Deserialize)]
pub struct AwardLimits {
    /// Largest single award considered routine
    pub max_single_award: u32,
    /// Points one giver is expected to stay under per window
    pub hourly_cap: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    3600
}

impl Default for AwardLimits {
    fn default() -> Self {
        Self {
            max_single_award: 50,
            hourly_cap: 200,
            window_secs: default_window_secs(),
        }
    }
}

/// Per-giver point counters over a sliding window
#[derive(Debug, Default)]
pub struct AwardCounters {
    entries: Mutex<HashMap<u64, Vec<(Instant, u32)>>>,
}

impl AwardCounters {
    /// Empty counter store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an award and return the giver's window total including it.
    /// Entries older than the window are pruned on the way.
    pub fn record(&self, giver_id: u64, points: u32, window: Duration) -> u64 {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("counter map poisoned");
        let history = entries.entry(giver_id).or_default();
        history.retain(|(at, _)| now.duration_since(*at) < window);
        history.push((now, points));
        history.iter().map(|(_, p)| u64::from(*p)).sum()
    }

    /// Record and log when a configured limit is exceeded. Never blocks
    /// the award.
    pub fn observe(&self, giver_id: u64, points: u32, limits: &AwardLimits) {
        if points > limits.max_single_award {
            warn!(
                giver_id,
                points,
                max_single_award = limits.max_single_award,
                "single award above configured limit"
            );
        }
        let window_total = self.record(giver_id, points, Duration::from_secs(limits.window_secs));
        if window_total > u64::from(limits.hourly_cap) {
            warn!(
                giver_id,
                window_total,
                hourly_cap = limits.hourly_cap,
                "giver over configured window cap"
            );
        }
    }

    /// Drop all counters
    pub fn reset(&self) {
        self.entries.lock().expect("counter map poisoned").clear();
    }
}
