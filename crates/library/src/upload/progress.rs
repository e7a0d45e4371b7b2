//! Aggregating per-entry progress into one overall percentage.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Overall progress after entry `entry_index` (zero-based) reported
/// `entry_percent` of its own upload.
///
/// Every entry carries equal weight regardless of size. An empty batch is
/// trivially complete.
///
/// ```
/// use hoist_library::upload::progress::combine;
///
/// assert_eq!(combine(0, 0.0, 4), 0.0);
/// assert_eq!(combine(1, 50.0, 4), 37.5);
/// assert_eq!(combine(3, 100.0, 4), 100.0);
/// ```
pub fn combine(entry_index: usize, entry_percent: f64, total_entries: usize) -> f64 {
    if total_entries == 0 {
        return 100.0;
    }
    let total = total_entries as f64;
    let percent = if entry_percent.is_nan() { 0.0 } else { entry_percent.clamp(0.0, 100.0) };
    // Same as `index * 100 / total + percent / total`, with a single rounding.
    ((entry_index as f64 * 100.0 + percent) / total).clamp(0.0, 100.0)
}

/// The published overall percentage, shared between a session and the
/// uploads it starts.
///
/// Every [`reset`](Self::reset) starts a new generation. Trackers created
/// before it are stale: uploads still running from an earlier batch can no
/// longer move the value.
#[derive(Clone, Debug)]
pub struct ProgressState(Arc<Shared>);

#[derive(Debug)]
struct Shared {
    sender: watch::Sender<f64>,
    /// Bumped under the channel's lock, so a publish can't straddle a reset.
    generation: AtomicU64,
}

impl ProgressState {
    pub fn new() -> Self {
        Self(Arc::new(Shared {
            sender: watch::Sender::new(0.0),
            generation: AtomicU64::new(0),
        }))
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.0.sender.subscribe()
    }

    pub fn current(&self) -> f64 {
        *self.0.sender.borrow()
    }

    /// Back to zero, ahead of a new upload.
    pub fn reset(&self) {
        self.0.sender.send_modify(|current| {
            self.0.generation.fetch_add(1, Ordering::Relaxed);
            *current = 0.0;
        });
    }

    fn generation(&self) -> u64 {
        self.0.generation.load(Ordering::Relaxed)
    }

    /// Publish `value` unless it would move progress backwards or comes from
    /// an earlier generation.
    fn advance(&self, generation: u64, value: f64) {
        self.0.sender.send_if_modified(|current| {
            if self.0.generation.load(Ordering::Relaxed) == generation && value > *current {
                *current = value;
                true
            } else {
                false
            }
        });
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds per-entry progress events for one batch into a [`ProgressState`].
///
/// Bound to the state's generation at creation.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total: usize,
    generation: u64,
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new(state: ProgressState, total: usize) -> Self {
        let generation = state.generation();
        Self { total, generation, state }
    }

    pub fn report(&self, entry_index: usize, entry_percent: f64) {
        self.state.advance(self.generation, combine(entry_index, entry_percent, self.total));
    }

    pub fn finish(&self) {
        self.state.advance(self.generation, 100.0);
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.0, 4, 0.0)]
    #[case(0, 100.0, 4, 25.0)]
    #[case(1, 50.0, 4, 37.5)]
    #[case(3, 100.0, 4, 100.0)]
    #[case(0, 100.0, 1, 100.0)]
    #[case(2, 100.0, 3, 100.0)]
    #[case(5, 100.0, 6, 100.0)]
    #[case(0, 0.0, 0, 100.0)]
    #[case(0, 250.0, 2, 50.0)]
    #[case(0, -5.0, 2, 0.0)]
    fn test_combine(#[case] index: usize, #[case] percent: f64, #[case] total: usize, #[case] expected: f64) {
        assert!((combine(index, percent, total) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_combine_is_monotone() {
        let total = 7;
        let mut previous = 0.0;
        for index in 0..total {
            for percent in [0.0, 12.5, 50.0, 99.0, 100.0] {
                let value = combine(index, percent, total);
                assert!(value >= previous, "{value} < {previous} at ({index}, {percent})");
                previous = value;
            }
        }
        assert!((previous - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_never_goes_backwards() {
        let state = ProgressState::new();
        let tracker = ProgressTracker::new(state.clone(), 4);
        tracker.report(3, 0.0);
        assert_eq!(state.current(), 75.0);
        // A slower entry reporting later can't pull the value down.
        tracker.report(0, 100.0);
        assert_eq!(state.current(), 75.0);
        tracker.report(3, 100.0);
        assert_eq!(state.current(), 100.0);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let state = ProgressState::new();
        let mut receiver = state.subscribe();
        let tracker = ProgressTracker::new(state.clone(), 2);
        tracker.report(0, 50.0);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow_and_update(), 25.0);
        // Unchanged values aren't republished.
        tracker.report(0, 10.0);
        assert!(!receiver.has_changed().unwrap());
        tracker.finish();
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), 100.0);
    }

    #[test]
    fn test_reset() {
        let state = ProgressState::new();
        ProgressTracker::new(state.clone(), 1).finish();
        assert_eq!(state.current(), 100.0);
        state.reset();
        assert_eq!(state.current(), 0.0);
    }

    #[test]
    fn test_stale_tracker_is_ignored_after_reset() {
        let state = ProgressState::new();
        let earlier = ProgressTracker::new(state.clone(), 3);
        earlier.report(0, 100.0);
        state.reset();
        let current = ProgressTracker::new(state.clone(), 1);
        earlier.report(2, 100.0);
        earlier.finish();
        assert_eq!(state.current(), 0.0);
        current.report(0, 50.0);
        assert_eq!(state.current(), 50.0);
        current.finish();
        assert_eq!(state.current(), 100.0);
    }
}
