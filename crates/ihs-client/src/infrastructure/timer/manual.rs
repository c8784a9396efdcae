//! A hand-driven [`RepeatingTimer`] for tests.
//!
//! Nothing ticks on its own: call [`ManualTimer::fire`] to run one tick of
//! every active task.  Stopping a handle removes its task and runs
//! [`TimerTask::stopped`] synchronously on the stopping thread.  Ticks run
//! without the timer's lock held, so a task may start or stop timers from
//! inside `tick`.
//!
//! # Usage in tests
//!
//! ```ignore
//! let timer = Arc::new(ManualTimer::new());
//! let client = StreamingClient::new(identity, cipher, transport, timer.clone(), interval);
//!
//! client.request_authorization(host, "1234");
//! timer.fire();                       // first request goes out
//! assert_eq!(timer.active_count(), 1);
//! ```

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use crate::application::scheduling::{RepeatingTimer, TimerHandle, TimerTask};

#[derive(Default)]
struct ManualState {
    next_id: u64,
    tasks: Vec<(u64, Box<dyn TimerTask>)>,
    last_interval: Option<Duration>,
    /// True while `fire` has the tasks checked out.
    firing: bool,
    /// Handles stopped while their task was checked out.
    stopped_while_firing: Vec<u64>,
}

#[derive(Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks every active task once, in start order.
    ///
    /// Tasks started during the round are not ticked until the next one.
    pub fn fire(&self) {
        let mut tasks = {
            let mut state = self.lock();
            state.firing = true;
            std::mem::take(&mut state.tasks)
        };

        for (_, task) in tasks.iter_mut() {
            task.tick();
        }

        let finished = {
            let mut state = self.lock();
            state.firing = false;
            let stopped = std::mem::take(&mut state.stopped_while_firing);
            let (finished, kept): (Vec<_>, Vec<_>) = tasks
                .into_iter()
                .partition(|(id, _)| stopped.contains(id));
            let started = std::mem::replace(&mut state.tasks, kept);
            state.tasks.extend(started);
            finished
        };
        for (_, task) in finished {
            task.stopped();
        }
    }

    /// Number of tasks started and not yet stopped.
    pub fn active_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// The interval passed to the most recent `start`.
    pub fn last_interval(&self) -> Option<Duration> {
        self.lock().last_interval
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RepeatingTimer for ManualTimer {
    fn start(&self, interval: Duration, task: Box<dyn TimerTask>) -> TimerHandle {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.last_interval = Some(interval);
            state.tasks.push((id, task));
            id
        };

        let state: Weak<Mutex<ManualState>> = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            let Some(state) = state.upgrade() else {
                return;
            };
            let removed = {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                let index = state.tasks.iter().position(|(task_id, _)| *task_id == id);
                match index {
                    Some(index) => Some(state.tasks.remove(index).1),
                    None => {
                        // Checked out by `fire`; it runs the cleanup.
                        if state.firing {
                            state.stopped_while_firing.push(id);
                        }
                        None
                    }
                }
            };
            if let Some(task) = removed {
                task.stopped();
            }
        })
    }
}
