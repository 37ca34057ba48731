//! Progress accounting
//!
//! Derives a monotonic completion percentage from decode/encode timestamps
//! relative to total source duration, and publishes `{status, percent}`
//! updates on a watch channel the caller may subscribe to.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle state of one conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Negotiating,
    Encoding,
    Flushing,
    Finalized,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Finalized | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Negotiating => "negotiating",
            RunStatus::Encoding => "encoding",
            RunStatus::Flushing => "flushing",
            RunStatus::Finalized => "finalized",
            RunStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One progress channel update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub status: RunStatus,
    /// 0–100, or `None` while the total duration is unknown
    pub percent: Option<u8>,
}

/// Monotonic percentage derivation from microsecond timestamps
#[derive(Debug, Default)]
pub struct ProgressTracker {
    duration_us: Option<i64>,
    origin_us: Option<i64>,
    best: Option<u8>,
}

impl ProgressTracker {
    pub fn new(duration_secs: Option<f64>) -> Self {
        let mut tracker = Self::default();
        tracker.set_duration(duration_secs);
        tracker
    }

    /// Set the total duration once probed. Non-positive or non-finite
    /// durations count as unknown.
    pub fn set_duration(&mut self, duration_secs: Option<f64>) {
        self.duration_us = duration_secs
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d * 1_000_000.0) as i64);
    }

    /// Fold in a timestamp. The first timestamp observed establishes the
    /// zero offset; the reported percentage never decreases.
    pub fn update(&mut self, timestamp_us: Option<i64>) -> Option<u8> {
        if let (Some(duration), Some(ts)) = (self.duration_us, timestamp_us) {
            let origin = *self.origin_us.get_or_insert(ts);
            let elapsed = (ts - origin).max(0);
            let percent = ((100.0 * elapsed as f64 / duration as f64).round() as i64)
                .clamp(0, 100) as u8;
            if self.best.map_or(true, |best| percent > best) {
                self.best = Some(percent);
            }
        }
        self.best
    }

    pub fn percent(&self) -> Option<u8> {
        self.best
    }

    /// Pin progress to 100 on successful finalization (duration known only).
    pub fn complete(&mut self) -> Option<u8> {
        if self.duration_us.is_some() {
            self.best = Some(100);
        }
        self.best
    }
}

/// Shared progress state publishing on a watch channel
///
/// Unit-driven updates from the two encode tasks and the periodic
/// clock-driven sampler all funnel through here.
#[derive(Debug)]
pub struct ProgressReporter {
    tracker: Mutex<ProgressTracker>,
    status: Mutex<RunStatus>,
    tx: watch::Sender<ProgressUpdate>,
}

impl ProgressReporter {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = watch::channel(ProgressUpdate {
            status: RunStatus::Idle,
            percent: None,
        });
        Arc::new(Self {
            tracker: Mutex::new(ProgressTracker::default()),
            status: Mutex::new(RunStatus::Idle),
            tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressUpdate> {
        self.tx.subscribe()
    }

    pub fn set_duration(&self, duration_secs: Option<f64>) {
        self.tracker.lock().set_duration(duration_secs);
    }

    pub fn set_status(&self, status: RunStatus) {
        *self.status.lock() = status;
        self.publish();
    }

    pub fn status(&self) -> RunStatus {
        *self.status.lock()
    }

    pub fn percent(&self) -> Option<u8> {
        self.tracker.lock().percent()
    }

    /// Fold a decode/clock timestamp into the tracker and publish.
    pub fn observe_timestamp(&self, timestamp_us: Option<i64>) {
        self.tracker.lock().update(timestamp_us);
        self.publish();
    }

    /// Successful finalization: status `Finalized`, percent pinned to 100
    /// when the duration is known.
    pub fn finish(&self) {
        self.tracker.lock().complete();
        *self.status.lock() = RunStatus::Finalized;
        self.publish();
    }

    fn publish(&self) {
        let update = ProgressUpdate {
            status: *self.status.lock(),
            percent: self.tracker.lock().percent(),
        };
        self.tx.send_replace(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duration_means_no_percent() {
        let mut tracker = ProgressTracker::new(None);
        assert_eq!(tracker.update(Some(5_000_000)), None);
        assert_eq!(tracker.complete(), None);
    }

    #[test]
    fn test_first_timestamp_sets_origin() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        // Source timestamps start at 2s; progress is measured from there.
        assert_eq!(tracker.update(Some(2_000_000)), Some(0));
        assert_eq!(tracker.update(Some(7_000_000)), Some(50));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.update(Some(0));
        assert_eq!(tracker.update(Some(6_000_000)), Some(60));
        // Out-of-order timestamp from the other track never lowers it.
        assert_eq!(tracker.update(Some(3_000_000)), Some(60));
        assert_eq!(tracker.update(Some(9_000_000)), Some(90));
    }

    #[test]
    fn test_percent_clamped_to_100() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.update(Some(0));
        assert_eq!(tracker.update(Some(25_000_000)), Some(100));
    }

    #[test]
    fn test_update_without_timestamp_keeps_best() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.update(Some(0));
        tracker.update(Some(4_000_000));
        assert_eq!(tracker.update(None), Some(40));
    }

    #[test]
    fn test_complete_pins_100_when_duration_known() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        tracker.update(Some(0));
        tracker.update(Some(9_940_000));
        assert_eq!(tracker.complete(), Some(100));
    }

    #[test]
    fn test_non_positive_duration_is_unknown() {
        let mut tracker = ProgressTracker::new(Some(0.0));
        assert_eq!(tracker.update(Some(1_000_000)), None);
        let mut tracker = ProgressTracker::new(Some(f64::NAN));
        assert_eq!(tracker.update(Some(1_000_000)), None);
    }

    #[test]
    fn test_reporter_publishes_status_and_percent() {
        let reporter = ProgressReporter::new();
        let rx = reporter.subscribe();
        reporter.set_duration(Some(10.0));
        reporter.set_status(RunStatus::Encoding);
        reporter.observe_timestamp(Some(0));
        reporter.observe_timestamp(Some(5_000_000));

        let update = *rx.borrow();
        assert_eq!(update.status, RunStatus::Encoding);
        assert_eq!(update.percent, Some(50));

        reporter.finish();
        let update = *rx.borrow();
        assert_eq!(update.status, RunStatus::Finalized);
        assert_eq!(update.percent, Some(100));
    }

    #[test]
    fn test_update_serializes_as_lowercase_json() {
        let update = ProgressUpdate {
            status: RunStatus::Encoding,
            percent: Some(42),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"status":"encoding","percent":42}"#);
    }
}
