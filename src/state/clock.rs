use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval},
};

const TICK: Duration = Duration::from_secs(1);

/// Elapsed-time counter of a live match.
///
/// The final duration is measured from a monotonic start instant. A background task
/// refreshes a once-per-second display counter; it carries no correctness weight and is
/// aborted when the clock stops or is dropped.
#[derive(Debug)]
pub struct MatchClock {
    started: Instant,
    stopped: Option<Duration>,
    display: Arc<AtomicU64>,
    ticker: JoinHandle<()>,
}

impl MatchClock {
    /// Start counting now. Must be called from within a Tokio runtime.
    pub fn start() -> Self {
        let started = Instant::now();
        let display = Arc::new(AtomicU64::new(0));
        let ticker = tokio::spawn({
            let display = Arc::clone(&display);
            async move {
                let mut ticks = interval(TICK);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticks.tick().await;
                    display.store(started.elapsed().as_secs(), Ordering::Relaxed);
                }
            }
        });

        Self {
            started,
            stopped: None,
            display,
            ticker,
        }
    }

    /// Exact elapsed time, frozen once stopped.
    pub fn elapsed(&self) -> Duration {
        self.stopped.unwrap_or_else(|| self.started.elapsed())
    }

    /// Seconds shown on the match clock, refreshed by the ticker.
    pub fn displayed_secs(&self) -> u64 {
        match self.stopped {
            Some(elapsed) => elapsed.as_secs(),
            None => self.display.load(Ordering::Relaxed),
        }
    }

    /// Freeze the elapsed time and cancel the ticker.
    pub fn stop(&mut self) -> Duration {
        let elapsed = self.elapsed();
        self.stopped = Some(elapsed);
        self.ticker.abort();
        elapsed
    }

    /// Whether the clock is still counting.
    pub fn is_running(&self) -> bool {
        self.stopped.is_none()
    }
}

impl Drop for MatchClock {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

/// Format whole seconds as `MM:SS`. Minutes are not wrapped at the hour.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::ZERO), "00:00");
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_millis(299_900)), "04:59");
        assert_eq!(format_duration(Duration::from_secs(75 * 60)), "75:00");
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_runtime_time() {
        let mut clock = MatchClock::start();
        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(format_duration(clock.elapsed()), "05:00");

        let frozen = clock.stop();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(clock.elapsed(), frozen);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_refreshes_display() {
        let clock = MatchClock::start();
        for _ in 0..3 {
            tokio::time::sleep(TICK).await;
        }
        tokio::task::yield_now().await;
        assert!(clock.displayed_secs() >= 2);
    }
}
