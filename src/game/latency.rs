//! Round-trip latency estimation from input emission to the next snapshot

use std::time::{Duration, Instant};

/// Display thresholds for the latency readout
pub const GOOD_LATENCY_MS: u64 = 100;
pub const FAIR_LATENCY_MS: u64 = 200;

/// Coarse latency grade for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyGrade {
    Good,
    Fair,
    Poor,
}

impl LatencyGrade {
    pub fn from_millis(ms: u64) -> Self {
        if ms < GOOD_LATENCY_MS {
            Self::Good
        } else if ms < FAIR_LATENCY_MS {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LatencyEstimator {
    /// Instant of the most recent unconfirmed emission
    pending: Option<Instant>,
    last_sample: Option<Duration>,
    samples: u64,
}

impl LatencyEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an intent emission. A later emission replaces an earlier pending one.
    pub fn record_emission(&mut self, now: Instant) {
        self.pending = Some(now);
    }

    /// Called on every authoritative snapshot. Yields a sample only if an
    /// emission was pending, and clears it.
    pub fn on_snapshot(&mut self, now: Instant) -> Option<Duration> {
        let sent_at = self.pending.take()?;
        let sample = now.saturating_duration_since(sent_at);
        self.last_sample = Some(sample);
        self.samples += 1;
        Some(sample)
    }

    pub fn latest(&self) -> Option<Duration> {
        self.last_sample
    }

    pub fn latest_millis(&self) -> Option<u64> {
        self.latest().map(|d| d.as_millis() as u64)
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
