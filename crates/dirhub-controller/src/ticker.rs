//! Sweep ticker with a jittered period.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Fires after an interval drawn uniformly from `[min, max]`, redrawn
/// after every tick.
///
/// [`JitterTicker::tick`] is cancel safe: dropping the future before it
/// completes keeps the current deadline.
#[derive(Debug)]
pub struct JitterTicker {
    min: Duration,
    max: Duration,
    deadline: Instant,
}

impl JitterTicker {
    /// A ticker whose first tick is one jittered interval from now.
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let mut ticker = Self {
            min,
            max,
            deadline: Instant::now(),
        };
        ticker.deadline = Instant::now() + ticker.draw();
        ticker
    }

    /// When the next tick fires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the next tick and schedule the one after it.
    pub async fn tick(&mut self) {
        tokio::time::sleep_until(self.deadline).await;
        self.deadline = Instant::now() + self.draw();
    }

    fn draw(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min >= max {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}
