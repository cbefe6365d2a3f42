#![forbid(unsafe_code)]

//! Frame boundaries between transition phases.
//!
//! A [`FrameScheduler`] resolves once the host has rendered the changes made
//! so far. The pipeline awaits one frame between each phase.

use std::time::Duration;

use async_trait::async_trait;

/// Source of rendering-frame signals.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    /// Resolve after the next frame has been produced.
    async fn next_frame(&self);
}

/// Frames on a fixed tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct IntervalFrames {
    interval: Duration,
}

impl IntervalFrames {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl FrameScheduler for IntervalFrames {
    async fn next_frame(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Frames that only yield to the executor. For headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateFrames;

#[async_trait]
impl FrameScheduler for ImmediateFrames {
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }
}
