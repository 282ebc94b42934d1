//! Time source for the pipeline's suspension points.
//!
//! Window cooldowns, inter-request pacing and backoff waits all go through
//! [`Clock::sleep`]. Production code waits for real; tests plug in a
//! simulated clock that advances instantly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Monotonic time plus a way to wait.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since this clock's origin.
    fn now(&self) -> Duration;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}
