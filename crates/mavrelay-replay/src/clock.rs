#[cfg(any(test, feature = "test-util"))]
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-util"))]
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Longest uninterrupted sleep; cancellation is checked between slices.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Monotonic time source for replay pacing.
pub trait Clock {
    /// Time since the clock was created.
    fn now(&self) -> Duration;

    /// Wait for `duration`, returning early once `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancellationToken);
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancellationToken) {
        let deadline = Instant::now() + duration;
        while !cancel.is_cancelled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Clock that only moves when told to. Sleeping advances it instantly and
/// records the requested duration.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping, as if work took `by`.
    pub fn advance(&self, by: Duration) {
        self.state.lock().now += by;
    }

    /// Every sleep requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn sleep(&self, duration: Duration, _cancel: &CancellationToken) {
        let mut state = self.state.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let cancel = CancellationToken::new();
        clock.sleep(Duration::from_millis(500), &cancel);
        clock.advance(Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(520));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn system_sleep_returns_early_when_cancelled() {
        let clock = SystemClock::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = Instant::now();
        clock.sleep(Duration::from_secs(5), &cancel);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn system_sleep_waits() {
        let clock = SystemClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(60), &CancellationToken::new());
        assert!(clock.now() - before >= Duration::from_millis(60));
    }
}
