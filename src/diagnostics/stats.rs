use serde::Serialize;
use std::time::{Duration, Instant};

use crate::effects::types::EffectKind;

/// Collects diagnostic statistics for a streaming session.
pub struct DiagnosticStats {
    frame_count: u64,
    drop_count: u64,
    total_bytes: u64,
    total_processing: Duration,
    start_time: Instant,
    last_effect: Option<EffectKind>,
    effect_switches: u64,
}

/// Serialisable snapshot of a session's diagnostic stats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub drop_count: u64,
    pub drop_rate: f64,
    pub mean_processing_ms: f64,
    pub bandwidth_bps: u64,
    pub effect: Option<EffectKind>,
    pub effect_switches: u64,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            drop_count: 0,
            total_bytes: 0,
            total_processing: Duration::ZERO,
            start_time: Instant::now(),
            last_effect: None,
            effect_switches: 0,
        }
    }

    /// Record a successfully processed frame.
    pub fn record_frame(&mut self, bytes: usize, processing: Duration) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.total_processing += processing;
    }

    /// Record a frame the pipeline refused.
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    /// Note which effect a frame was processed with. Counts a switch each
    /// time it differs from the previous frame's effect.
    pub fn record_effect(&mut self, effect: EffectKind) {
        if let Some(previous) = self.last_effect {
            if previous != effect {
                self.effect_switches += 1;
            }
        }
        self.last_effect = Some(effect);
    }

    /// Calculate current FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.frame_count + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Average time spent inside the pipeline per processed frame.
    pub fn mean_processing_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.total_processing.as_secs_f64() * 1000.0 / self.frame_count as f64
    }

    /// Processed output bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            drop_count: self.drop_count,
            drop_rate: self.drop_rate(),
            mean_processing_ms: self.mean_processing_ms(),
            bandwidth_bps: self.bandwidth_bps(),
            effect: self.last_effect,
            effect_switches: self.effect_switches,
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn initialises_with_zero_values() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.drop_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.effect_switches, 0);
    }

    #[test]
    fn record_frame_increments_frame_count() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::from_micros(10));
        assert_eq!(stats.frame_count, 1);
        stats.record_frame(1000, Duration::from_micros(10));
        assert_eq!(stats.frame_count, 2);
    }

    #[test]
    fn record_drop_increments_drop_count() {
        let mut stats = DiagnosticStats::new();
        stats.record_drop();
        stats.record_drop();
        assert_eq!(stats.drop_count, 2);
    }

    #[test]
    fn fps_is_positive_after_frames() {
        let mut stats = DiagnosticStats::new();
        for _ in 0..30 {
            stats.record_frame(1000, Duration::ZERO);
        }
        thread::sleep(Duration::from_millis(20));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn drop_rate_returns_percentage() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::ZERO);
        stats.record_frame(1000, Duration::ZERO);
        stats.record_drop();
        let rate = stats.drop_rate();
        assert!(
            (rate - 33.333).abs() < 1.0,
            "drop rate should be ~33%, got {rate}"
        );
    }

    #[test]
    fn drop_rate_zero_when_no_events() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn mean_processing_averages_over_frames() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(10, Duration::from_millis(2));
        stats.record_frame(10, Duration::from_millis(4));
        assert!((stats.mean_processing_ms() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn effect_switches_count_changes_only() {
        let mut stats = DiagnosticStats::new();
        stats.record_effect(EffectKind::Normal);
        stats.record_effect(EffectKind::Normal);
        stats.record_effect(EffectKind::Invert);
        stats.record_effect(EffectKind::Invert);
        stats.record_effect(EffectKind::Blur);
        assert_eq!(stats.effect_switches, 2);
        assert_eq!(stats.snapshot().effect, Some(EffectKind::Blur));
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(10_000, Duration::ZERO);
        thread::sleep(Duration::from_millis(20));
        assert!(stats.bandwidth_bps() > 0);
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::from_millis(1));
        stats.record_drop();
        stats.record_effect(EffectKind::Blur);
        stats.reset();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.drop_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.last_effect.is_none());
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(5000, Duration::from_millis(1));
        stats.record_effect(EffectKind::CannyEdge);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["frameCount"].is_number());
        assert!(json["dropCount"].is_number());
        assert!(json["meanProcessingMs"].is_number());
        assert_eq!(json["effect"], "canny_edge");
        assert_eq!(json["effectSwitches"], 0);
    }

    #[test]
    fn snapshot_effect_is_null_before_first_frame() {
        let stats = DiagnosticStats::new();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["effect"].is_null());
    }
}
