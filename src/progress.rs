//! Process-wide render progress tracking
//!
//! Maps an opaque, client-minted request identifier to a percentage while a
//! document is being generated. The render pipeline writes to it; the SSE
//! route polls it on a fixed cadence. State is ephemeral and best-effort:
//! entries live in memory only, so a multi-process deployment loses progress
//! visibility for requests routed to a different process than the one
//! serving the push channel. Known limitation, not fixed by this design.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

/// Grace period before a completed entry is dropped, so a late poll still
/// sees 100.
pub const EXPIRY_DELAY: Duration = Duration::from_secs(10);

/// Injectable progress store, owned by the application state.
///
/// Values for a given id are monotonically non-decreasing: `set` never
/// lowers an entry, clamps to 99, and only `complete` writes 100. The clamp
/// keeps a client from ever observing "100% but still generating" due to
/// rounding in the phase arithmetic.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    entries: Arc<Mutex<HashMap<String, u8>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intermediate progress, clamped to 0-99.
    pub fn set(&self, id: &str, pct: u8) {
        let clamped = pct.min(99);
        let mut entries = self.entries.lock();
        let entry = entries.entry(id.to_string()).or_insert(0);
        if clamped > *entry {
            *entry = clamped;
        }
    }

    /// Mark a job finished: the only way an entry reaches exactly 100.
    pub fn complete(&self, id: &str) {
        self.entries.lock().insert(id.to_string(), 100);
    }

    /// Current value for an id; unknown ids report 0.
    pub fn get(&self, id: &str) -> u8 {
        self.entries.lock().get(id).copied().unwrap_or(0)
    }

    /// Drop the entry after `delay`. Spawned as a detached task; must be
    /// called from within a Tokio runtime.
    pub fn expire_after(&self, id: String, delay: Duration) {
        let tracker = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracker.entries.lock().remove(&id);
        });
    }

    /// Poll the value for `id` every `period`, emitting it whether or not it
    /// changed. The first emission is immediate; the stream ends right after
    /// emitting a value of 100. Dropping the stream tears the timer down,
    /// which is how a disconnecting subscriber stops the polling.
    pub fn subscribe(
        &self,
        id: impl Into<String>,
        period: Duration,
    ) -> impl Stream<Item = u8> + Send + 'static {
        let tracker = self.clone();
        let id = id.into();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        futures::stream::unfold((interval, false), move |(mut interval, done)| {
            let tracker = tracker.clone();
            let id = id.clone();
            async move {
                if done {
                    return None;
                }
                interval.tick().await;
                let value = tracker.get(&id);
                Some((value, (interval, value >= 100)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn unknown_id_reads_zero() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.get("nope"), 0);
    }

    #[test]
    fn set_clamps_to_99() {
        let tracker = ProgressTracker::new();
        tracker.set("a", 100);
        assert_eq!(tracker.get("a"), 99);
        tracker.set("a", 255);
        assert_eq!(tracker.get("a"), 99);
    }

    #[test]
    fn values_never_decrease() {
        let tracker = ProgressTracker::new();
        tracker.set("a", 50);
        tracker.set("a", 30);
        assert_eq!(tracker.get("a"), 50);
    }

    #[test]
    fn complete_sets_exactly_100() {
        let tracker = ProgressTracker::new();
        tracker.set("a", 80);
        tracker.complete("a");
        assert_eq!(tracker.get("a"), 100);
    }

    #[tokio::test]
    async fn expire_removes_entry_after_delay() {
        let tracker = ProgressTracker::new();
        tracker.complete("a");
        tracker.expire_after("a".to_string(), Duration::from_millis(20));
        assert_eq!(tracker.get("a"), 100);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.get("a"), 0);
    }

    #[tokio::test]
    async fn subscribe_emits_immediately_and_keeps_polling() {
        let tracker = ProgressTracker::new();
        let stream = tracker.subscribe("job", Duration::from_millis(5));
        futures::pin_mut!(stream);

        // Unknown job polls as 0 and the stream stays open.
        assert_eq!(stream.next().await, Some(0));
        tracker.set("job", 40);
        assert_eq!(stream.next().await, Some(40));
    }

    #[tokio::test]
    async fn subscribe_terminates_after_100() {
        let tracker = ProgressTracker::new();
        tracker.set("job", 90);
        let stream = tracker.subscribe("job", Duration::from_millis(5));
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(90));
        tracker.complete("job");
        assert_eq!(stream.next().await, Some(100));
        assert_eq!(stream.next().await, None, "stream must end after 100");
    }

    #[tokio::test]
    async fn reported_values_are_monotonic() {
        let tracker = ProgressTracker::new();
        let stream = tracker.subscribe("job", Duration::from_millis(2));
        futures::pin_mut!(stream);

        let writer = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                for pct in [10u8, 25, 40, 70, 99] {
                    tracker.set("job", pct);
                    tokio::time::sleep(Duration::from_millis(3)).await;
                }
                tracker.complete("job");
            })
        };

        let mut last = 0u8;
        while let Some(value) = stream.next().await {
            assert!(value >= last, "progress went backwards: {} -> {}", last, value);
            assert!(value <= 100);
            last = value;
        }
        assert_eq!(last, 100, "final report must be exactly 100");
        writer.await.unwrap();
    }
}
