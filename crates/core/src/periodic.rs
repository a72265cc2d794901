//! Cancellable periodic checks.
//!
//! A [`PeriodicTask`] runs a probe on a fixed interval in a spawned task and
//! publishes each result on a `watch` channel. The task is owned by the
//! `PeriodicTask` value: cancelling it or dropping it stops the timer.

use std::future::Future;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

pub struct PeriodicTask<T> {
    handle: JoinHandle<()>,
    latest: watch::Receiver<Option<T>>,
}

impl<T> PeriodicTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawns the task. The first probe runs immediately.
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut probe: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (tx, latest) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let value = probe().await;
                debug!(task = name, "Periodic check completed");
                if tx.send(Some(value)).is_err() {
                    break;
                }
            }
        });
        Self { handle, latest }
    }

    /// The most recent probe result, if any has completed.
    pub fn latest(&self) -> Option<T> {
        self.latest.borrow().clone()
    }

    /// A receiver that is notified after every probe.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.latest.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl<T> Drop for PeriodicTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
