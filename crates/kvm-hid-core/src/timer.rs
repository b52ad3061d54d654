//! Schedule-and-cancel repeating timer.
//!
//! A [`TimerHandle`] owns a spawned tokio task that runs a callback on a fixed
//! period.  Dropping or cancelling the handle aborts the task, so a timer can
//! never outlive the object that scheduled it.
//!
//! The first tick fires one full period after scheduling, not immediately.
//! Missed ticks (the callback ran long, or the runtime was busy) are delayed
//! rather than bursted.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a repeating task.  Aborts the task on cancel or drop.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Spawns a task that awaits `tick()` every `period`.
    ///
    /// Must be called from within a tokio runtime.  `period` must be non-zero.
    pub fn every<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        Self { task }
    }

    /// Stops the timer.  A tick already running is aborted at its next await.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
