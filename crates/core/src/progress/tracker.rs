//! Throttled speed and ETA computation.

use std::time::{Duration, Instant};
use thiserror::Error;

use super::render::ProgressRenderer;

/// Default minimum interval between two emissions.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);

/// Errors raised when constructing a tracker.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// The byte total is unknown, so no percentage or ETA can be derived.
    #[error("cannot track progress without a known byte total")]
    UnknownTotal,
}

/// Remaining-time estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    /// No usable speed sample yet.
    Calculating,
    Remaining(Duration),
}

/// One emitted progress figure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub downloaded: u64,
    pub total: u64,
    /// Bytes per second over the last emission window.
    pub speed_bps: f64,
    pub eta: Eta,
}

impl ProgressSnapshot {
    /// Completion in percent, capped at 100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.downloaded as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

/// Lifecycle of a tracker. There is no way back from `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Created,
    Running,
    Finished,
}

/// Tracks one transfer of a known size.
pub struct ProgressTracker {
    total: u64,
    throttle: Duration,
    last_emit_at: Instant,
    last_emit_bytes: u64,
    state: TrackerState,
    last_snapshot: Option<ProgressSnapshot>,
    renderer: Box<dyn ProgressRenderer>,
}

impl ProgressTracker {
    /// Creates a tracker and starts its renderer.
    pub fn new(total: u64, renderer: Box<dyn ProgressRenderer>) -> Result<Self, ProgressError> {
        Self::with_throttle(total, DEFAULT_THROTTLE, renderer)
    }

    /// Creates a tracker with a custom emission interval.
    pub fn with_throttle(
        total: u64,
        throttle: Duration,
        mut renderer: Box<dyn ProgressRenderer>,
    ) -> Result<Self, ProgressError> {
        if total == 0 {
            return Err(ProgressError::UnknownTotal);
        }
        renderer.start(total);
        Ok(Self {
            total,
            throttle,
            last_emit_at: Instant::now(),
            last_emit_bytes: 0,
            state: TrackerState::Created,
            last_snapshot: None,
            renderer,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// The most recent emitted snapshot, if any.
    pub fn last_snapshot(&self) -> Option<&ProgressSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Records a downloaded-byte sample. Returns whether a snapshot was emitted.
    pub fn update(&mut self, downloaded: u64) -> bool {
        self.update_at(downloaded, Instant::now())
    }

    /// Same as [`update`](Self::update) with an explicit sample time.
    pub fn update_at(&mut self, downloaded: u64, now: Instant) -> bool {
        if self.state == TrackerState::Finished {
            return false;
        }
        self.state = TrackerState::Running;

        let elapsed = now.saturating_duration_since(self.last_emit_at);
        if elapsed < self.throttle {
            return false;
        }

        let downloaded = downloaded.min(self.total);
        let secs = elapsed.as_secs_f64();
        let byte_diff = downloaded.saturating_sub(self.last_emit_bytes) as f64;
        let speed_bps = if secs > 0.0 { byte_diff / secs } else { 0.0 };
        let eta = if speed_bps > 0.0 {
            let remaining = (self.total - downloaded) as f64 / speed_bps;
            Eta::Remaining(Duration::from_secs_f64(remaining))
        } else {
            Eta::Calculating
        };

        let snapshot = ProgressSnapshot {
            downloaded,
            total: self.total,
            speed_bps,
            eta,
        };
        self.renderer.render(&snapshot);
        self.last_snapshot = Some(snapshot);
        self.last_emit_at = now;
        self.last_emit_bytes = downloaded;
        true
    }

    /// Forces a final 100% emission and releases the renderer.
    ///
    /// Calling it again is a no-op.
    pub fn finish(&mut self) {
        if self.state == TrackerState::Finished {
            return;
        }
        let snapshot = ProgressSnapshot {
            downloaded: self.total,
            total: self.total,
            speed_bps: 0.0,
            eta: Eta::Remaining(Duration::ZERO),
        };
        self.renderer.finish(&snapshot);
        self.last_snapshot = Some(snapshot);
        self.state = TrackerState::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRenderer;

    fn tracker(total: u64) -> (ProgressTracker, RecordingRenderer) {
        let renderer = RecordingRenderer::new();
        let tracker = ProgressTracker::new(total, Box::new(renderer.clone())).unwrap();
        (tracker, renderer)
    }

    #[test]
    fn test_zero_total_rejected() {
        let result = ProgressTracker::new(0, Box::new(RecordingRenderer::new()));
        assert!(matches!(result, Err(ProgressError::UnknownTotal)));
    }

    #[test]
    fn test_renderer_started_with_total() {
        let (_tracker, renderer) = tracker(4096);
        assert_eq!(renderer.started_with(), Some(4096));
    }

    #[test]
    fn test_update_throttled_within_window() {
        let (mut tracker, renderer) = tracker(1000);
        let t0 = Instant::now();

        assert!(tracker.update_at(100, t0 + Duration::from_millis(600)));
        assert!(!tracker.update_at(200, t0 + Duration::from_millis(700)));
        assert!(!tracker.update_at(300, t0 + Duration::from_millis(1099)));
        assert!(tracker.update_at(400, t0 + Duration::from_millis(1100)));

        assert_eq!(renderer.rendered().len(), 2);
        assert_eq!(tracker.state(), TrackerState::Running);
    }

    #[test]
    fn test_speed_and_eta() {
        let (mut tracker, _renderer) = tracker(10_000);
        let t0 = Instant::now();

        tracker.update_at(1_000, t0 + Duration::from_secs(1));
        tracker.update_at(3_000, t0 + Duration::from_secs(2));

        let snap = tracker.last_snapshot().unwrap();
        assert_eq!(snap.downloaded, 3_000);
        assert!((snap.speed_bps - 2_000.0).abs() < 1.0);
        match snap.eta {
            Eta::Remaining(d) => assert!((d.as_secs_f64() - 3.5).abs() < 0.01),
            Eta::Calculating => panic!("expected an estimate"),
        }
    }

    #[test]
    fn test_stalled_transfer_is_calculating() {
        let (mut tracker, _renderer) = tracker(10_000);
        let t0 = Instant::now();

        tracker.update_at(0, t0 + Duration::from_secs(1));
        assert_eq!(tracker.last_snapshot().unwrap().eta, Eta::Calculating);
        assert_eq!(tracker.last_snapshot().unwrap().speed_bps, 0.0);
    }

    #[test]
    fn test_finish_reports_total_and_zero_eta() {
        let (mut tracker, renderer) = tracker(5_000);
        let t0 = Instant::now();
        for (i, bytes) in [1_000u64, 2_000, 3_500, 5_000].iter().enumerate() {
            tracker.update_at(*bytes, t0 + Duration::from_secs(i as u64 + 1));
        }
        tracker.finish();

        let last = renderer.finished().unwrap();
        assert_eq!(last.downloaded, 5_000);
        assert_eq!(last.eta, Eta::Remaining(Duration::ZERO));
        assert_eq!(last.speed_bps, 0.0);
        assert_eq!(tracker.state(), TrackerState::Finished);
    }

    #[test]
    fn test_no_updates_after_finish() {
        let (mut tracker, renderer) = tracker(100);
        tracker.finish();
        tracker.finish();
        assert!(!tracker.update_at(50, Instant::now() + Duration::from_secs(5)));
        assert!(renderer.rendered().is_empty());
        assert_eq!(renderer.finish_count(), 1);
    }

    #[test]
    fn test_overshoot_clamped_to_total() {
        let (mut tracker, _renderer) = tracker(100);
        tracker.update_at(250, Instant::now() + Duration::from_secs(1));
        assert_eq!(tracker.last_snapshot().unwrap().downloaded, 100);
        assert_eq!(tracker.last_snapshot().unwrap().percent(), 100.0);
    }
}
