use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

use crate::task::RepeatingTask;
use crate::time::TimeSource;

#[derive(Debug)]
struct ClockState {
    now: DateTime<Utc>,
    renders: u64,
}

/// Current time, redrawn once per tick while mounted.
pub struct ClockDisplay {
    source: Arc<dyn TimeSource>,
    tick: Duration,
    state: Arc<Mutex<ClockState>>,
    task: Option<RepeatingTask>,
}

impl ClockDisplay {
    pub fn new(source: Arc<dyn TimeSource>, tick: Duration) -> Self {
        let now = source.now();
        Self {
            source,
            tick,
            state: Arc::new(Mutex::new(ClockState { now, renders: 0 })),
            task: None,
        }
    }

    /// Start ticking. Must be called inside a tokio runtime.
    pub fn mount(&mut self) {
        if self.is_mounted() {
            return;
        }

        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.source);
        self.task = Some(RepeatingTask::start("clock", self.tick, move || {
            let now = source.now();
            let mut state = state.lock();
            state.now = now;
            state.renders += 1;
            std::future::ready(())
        }));
    }

    pub fn unmount(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.stop();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(RepeatingTask::is_running)
    }

    /// Time captured at the last tick
    pub fn now(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    /// Number of ticks since construction
    pub fn renders(&self) -> u64 {
        self.state.lock().renders
    }

    /// Local time as `HH:MM:SS`
    pub fn display(&self) -> String {
        self.now().with_timezone(&Local).format("%H:%M:%S").to_string()
    }
}

impl std::fmt::Debug for ClockDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockDisplay")
            .field("tick", &self.tick)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::RuntimeClock;
    use chrono::TimeZone;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn clock() -> ClockDisplay {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();
        ClockDisplay::new(
            Arc::new(RuntimeClock::starting_at(start)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_changes_once_per_second() {
        let mut clock = clock();
        clock.mount();
        let initial = clock.display();

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(clock.display(), initial);
        assert_eq!(clock.renders(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let after_one = clock.display();
        assert_ne!(after_one, initial);
        assert_eq!(clock.renders(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_ne!(clock.display(), after_one);
        assert_eq!(clock.renders(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_unmount() {
        let mut clock = clock();
        clock.mount();

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(clock.renders(), 1);

        clock.unmount();
        assert!(!clock.is_mounted());
        let frozen = clock.display();

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(clock.renders(), 1);
        assert_eq!(clock.display(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_twice_keeps_one_timer() {
        let mut clock = clock();
        clock.mount();
        clock.mount();

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(clock.renders(), 1);
    }
}
