//! Timer-based coalescing of trigger bursts
//!
//! Every `trigger` cancels the pending deadline and schedules a new one
//! `window` later; the action runs once, with the last triggered value,
//! after the window passes without a new trigger.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Debounced action running on a background tokio task.
///
/// Must be created inside a tokio runtime. Dropping the debouncer cancels
/// any pending run.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(window: Duration, mut action: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                let deadline = tokio::time::sleep(window);
                tokio::pin!(deadline);

                loop {
                    tokio::select! {
                        biased;
                        next = rx.recv() => match next {
                            Some(value) => {
                                latest = value;
                                deadline.as_mut().reset(Instant::now() + window);
                            }
                            // Debouncer dropped with a run pending
                            None => return,
                        },
                        () = &mut deadline => break,
                    }
                }

                action(latest);
            }
        });

        Self { tx, task }
    }

    /// Schedule (or reschedule) the action with `value`
    pub fn trigger(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::warn!("Debounce task is gone, trigger dropped");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl FnMut(u32) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |v| sink.lock().unwrap().push(v))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_run_with_last_value() {
        let (calls, action) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), action);

        for i in 0..10 {
            debouncer.trigger(i);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*calls.lock().unwrap(), vec![9]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*calls.lock().unwrap(), vec![9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_run_separately() {
        let (calls, action) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), action);

        debouncer.trigger(1);
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.trigger(2);
        debouncer.trigger(3);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_run() {
        let (calls, action) = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(300), action);

        debouncer.trigger(1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(debouncer);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(calls.lock().unwrap().is_empty());
    }
}
