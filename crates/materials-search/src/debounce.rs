//! Trailing-edge debounce for the free-text query.
//!
//! Every [`Debouncer::commit`] restarts the quiescence window; the last value
//! is emitted once, by [`Debouncer::poll`], after the window has elapsed with
//! no further commits. The debouncer owns no timer: its owner waits on
//! [`Debouncer::deadline`], which is what makes teardown leak-free.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::utils::clock::Clock;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

struct Pending<T> {
    value: T,
    deadline: Instant,
}

pub struct Debouncer<T> {
    window: Duration,
    clock: Arc<dyn Clock>,
    pending: Option<Pending<T>>,
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value and restart the window. Returns the new deadline.
    pub fn commit(&mut self, value: T) -> Instant {
        self.commit_within(value, self.window)
    }

    pub fn commit_within(&mut self, value: T, window: Duration) -> Instant {
        let deadline = self.clock.now() + window;
        self.pending = Some(Pending { value, deadline });
        deadline
    }

    /// Emit the pending value if its window has elapsed.
    pub fn poll(&mut self) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|pending| self.clock.now() >= pending.deadline);
        if ready {
            self.pending.take().map(|pending| pending.value)
        } else {
            None
        }
    }

    /// Emit the pending value right away, skipping the rest of the window.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn time_until_ready(&self) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|pending| pending.deadline.saturating_duration_since(self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;

    fn debouncer() -> (Debouncer<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (Debouncer::new(DEFAULT_WINDOW, clock.clone()), clock)
    }

    #[test]
    fn nothing_pending_emits_nothing() {
        let (mut debouncer, clock) = debouncer();
        clock.advance(Duration::from_secs(5));
        assert!(debouncer.poll().is_none());
        assert!(debouncer.time_until_ready().is_none());
    }

    #[test]
    fn emits_after_quiescence_window() {
        let (mut debouncer, clock) = debouncer();
        debouncer.commit("steel".to_string());

        clock.advance(Duration::from_millis(299));
        assert!(debouncer.poll().is_none());

        clock.advance(Duration::from_millis(1));
        assert_eq!(debouncer.poll(), Some("steel".to_string()));
    }

    #[test]
    fn rapid_commits_emit_once_with_last_value() {
        let (mut debouncer, clock) = debouncer();
        let mut emitted = Vec::new();
        for value in ["c", "co", "con", "concrete", "concrete block"] {
            debouncer.commit(value.to_string());
            clock.advance(Duration::from_millis(100));
            emitted.extend(debouncer.poll());
        }
        assert!(emitted.is_empty());

        clock.advance(Duration::from_millis(200));
        emitted.extend(debouncer.poll());
        emitted.extend(debouncer.poll());
        assert_eq!(emitted, vec!["concrete block".to_string()]);
    }

    #[test]
    fn commit_restarts_the_window() {
        let (mut debouncer, clock) = debouncer();
        let first = debouncer.commit("a".to_string());
        clock.advance(Duration::from_millis(200));
        let second = debouncer.commit("ab".to_string());
        assert_eq!(second - first, Duration::from_millis(200));
        assert_eq!(
            debouncer.time_until_ready(),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn restartable_after_emission() {
        let (mut debouncer, clock) = debouncer();
        debouncer.commit("one".to_string());
        clock.advance(DEFAULT_WINDOW);
        assert_eq!(debouncer.poll().as_deref(), Some("one"));

        debouncer.commit("two".to_string());
        clock.advance(DEFAULT_WINDOW);
        assert_eq!(debouncer.poll().as_deref(), Some("two"));
    }

    #[test]
    fn cancel_drops_pending_value() {
        let (mut debouncer, clock) = debouncer();
        debouncer.commit("gone".to_string());
        assert!(debouncer.cancel());
        clock.advance(DEFAULT_WINDOW);
        assert!(debouncer.poll().is_none());
        assert!(!debouncer.cancel());
    }

    #[test]
    fn flush_emits_immediately() {
        let (mut debouncer, _clock) = debouncer();
        debouncer.commit("now".to_string());
        assert_eq!(debouncer.flush().as_deref(), Some("now"));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn custom_window_per_commit() {
        let (mut debouncer, clock) = debouncer();
        debouncer.commit_within("fast".to_string(), Duration::from_millis(50));
        clock.advance(Duration::from_millis(50));
        assert_eq!(debouncer.poll().as_deref(), Some("fast"));
    }
}
