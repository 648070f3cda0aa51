//! Backoff waiting. The orchestrator never sleeps directly; it goes through a
//! `Delay` so retry schedules can be observed in tests without real time
//! passing.

use std::time::Duration;

/// Suspends the caller for a backoff interval without blocking other work.
#[async_trait::async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait::async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
