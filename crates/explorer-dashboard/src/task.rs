//! Repeating background work with an explicit lifecycle.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A callback run every `period`, first one `period` after start.
///
/// Each callback runs to completion before the next tick is awaited.
/// Dropping the task stops it.
#[derive(Debug)]
pub struct RepeatingTask {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn on the current tokio runtime
    pub fn start<F, Fut>(name: impl Into<String>, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let period = period.max(MIN_PERIOD);
        // Anchored before spawning so the first deadline does not depend on
        // when the task is first polled.
        let first = Instant::now() + period;
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tracing::trace!(task = %task_name, "tick");
                tick().await;
            }
        });

        tracing::debug!(task = %name, ?period, "Started repeating task");
        Self {
            name,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel future ticks. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(task = %self.name, "Stopped repeating task");
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_task(period: Duration) -> (RepeatingTask, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task = RepeatingTask::start("test", period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        });
        (task, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (task, count) = counting_task(Duration::from_secs(5));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let (mut task, count) = counting_task(Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        task.stop();
        task.stop();
        assert!(!task.is_running());

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let (task, count) = counting_task(Duration::from_secs(1));
        drop(task);

        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
