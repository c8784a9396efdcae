//! Repeating timer backed by `tokio::time::interval`.
//!
//! Each started task gets its own spawned future.  The future ticks the task
//! immediately, then once per period, until the [`TimerHandle`] is stopped or
//! dropped; it then calls [`TimerTask::stopped`] from the same future, so the
//! cleanup hook never overlaps a tick.

use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::application::scheduling::{RepeatingTimer, TimerHandle, TimerTask};

/// Shortest period accepted; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Fails when called outside a Tokio runtime.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl RepeatingTimer for TokioTimer {
    fn start(&self, interval: Duration, mut task: Box<dyn TimerTask>) -> TimerHandle {
        let period = interval.max(MIN_PERIOD);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    // A dropped sender counts as a stop request too.
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => task.tick(),
                }
            }
            debug!("repeating timer stopped");
            task.stopped();
        });

        TimerHandle::new(move || {
            let _ = stop_tx.send(());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTask {
        ticks: Arc<AtomicUsize>,
        stopped: Arc<AtomicBool>,
    }

    impl TimerTask for CountingTask {
        fn tick(&mut self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn stopped(self: Box<Self>) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    fn counting_task() -> (Box<CountingTask>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicBool::new(false));
        let task = Box::new(CountingTask {
            ticks: Arc::clone(&ticks),
            stopped: Arc::clone(&stopped),
        });
        (task, ticks, stopped)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate_then_periodic() {
        // Arrange
        let timer = TokioTimer::current().unwrap();
        let (task, ticks, _) = counting_task();

        // Act
        let handle = timer.start(Duration::from_millis(1000), task);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let after_start = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2499)).await;

        // Assert
        assert_eq!(after_start, 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_runs_cleanup_and_ends_ticks() {
        // Arrange
        let timer = TokioTimer::current().unwrap();
        let (task, ticks, stopped) = counting_task();
        let handle = timer.start(Duration::from_millis(100), task);
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Act
        handle.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let ticks_at_stop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Assert
        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(ticks.load(Ordering::SeqCst), ticks_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let timer = TokioTimer::current().unwrap();
        let (task, ticks, _) = counting_task();

        let handle = timer.start(Duration::ZERO, task);
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(ticks.load(Ordering::SeqCst) >= 2);
        drop(handle);
    }

    #[test]
    fn test_current_outside_runtime_fails() {
        assert!(TokioTimer::current().is_err());
    }

    #[test]
    fn test_current_inside_runtime_succeeds() {
        tokio_test::block_on(async {
            assert!(TokioTimer::current().is_ok());
        });
    }
}
