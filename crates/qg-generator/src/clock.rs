//! Wall-clock time for production runs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use qg_core::Clock;

/// Real time, measured from construction. Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_uses_tokio_timer() {
        let clock = SystemClock::new();
        let before = tokio::time::Instant::now();

        clock.sleep(Duration::from_secs(60)).await;

        assert!(tokio::time::Instant::now() - before >= Duration::from_secs(60));
    }
}
