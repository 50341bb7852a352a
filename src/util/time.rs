//! Time utilities for the client frame loop

use std::time::{Duration, Instant};

/// Frame rate of the fixed-timestep scheduler
pub const FRAME_TPS: u32 = 60;
pub const FRAME_DURATION_MICROS: u64 = 1_000_000 / FRAME_TPS as u64;

/// Fixed frame period
pub fn frame_duration() -> Duration {
    Duration::from_micros(FRAME_DURATION_MICROS)
}

/// Client start time for uptime reporting
static CLIENT_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize client start time (call once at startup)
pub fn init_client_time() {
    CLIENT_START.get_or_init(Instant::now);
}

/// Get client uptime in seconds
pub fn uptime_secs() -> u64 {
    CLIENT_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration().as_micros() as u64, FRAME_DURATION_MICROS);
        assert!(frame_duration() < Duration::from_millis(17));
    }
}
