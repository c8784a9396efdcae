//! The repeating-timer abstraction the authorization use case runs on.
//!
//! A [`RepeatingTimer`] owns a [`TimerTask`], calls
//! [`tick`](TimerTask::tick) once immediately and then once per interval, and
//! after it has been stopped calls [`stopped`](TimerTask::stopped) exactly
//! once.  No tick runs after or concurrently with `stopped`, so the task can
//! release whatever it owns there.
//!
//! Stopping is requested through the [`TimerHandle`] returned by
//! [`RepeatingTimer::start`].  Dropping the handle stops the timer too.

use std::fmt;
use std::time::Duration;

/// Work driven by a [`RepeatingTimer`].
pub trait TimerTask: Send + 'static {
    /// One timer period elapsed (the first call happens without delay).
    fn tick(&mut self);

    /// Cleanup hook: the timer has stopped and will never tick again.
    fn stopped(self: Box<Self>);
}

/// Runs [`TimerTask`]s on a fixed interval.
pub trait RepeatingTimer: Send + Sync {
    fn start(&self, interval: Duration, task: Box<dyn TimerTask>) -> TimerHandle;
}

/// Stops the timer it was returned for.
///
/// Stopping only requests the stop; [`TimerTask::stopped`] may run later on
/// the timer's own thread.
pub struct TimerHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    pub fn stop(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.stop.is_some())
            .finish()
    }
}
