//! Owned per-frame callback
//!
//! A [`FrameLoop`] is a tokio task ticking at a fixed interval. The callback can suspend
//! the loop until [`FrameLoop::wake`] is called, or stop it for good. Dropping the handle
//! aborts the task, so a callback never outlives its owner.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What the loop does after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    /// Park until woken
    Suspend,
    Stop,
}

pub struct FrameLoop {
    handle: JoinHandle<()>,
    wake: Arc<Notify>,
    joined: bool,
}

impl FrameLoop {
    /// Spawn the loop on the current tokio runtime
    pub fn spawn<F>(interval: Duration, mut on_frame: F) -> Self
    where
        F: FnMut(Instant) -> FrameControl + Send + 'static,
    {
        let wake = Arc::new(Notify::new());
        let notified = Arc::clone(&wake);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let now = ticker.tick().await.into_std();
                match on_frame(now) {
                    FrameControl::Continue => {}
                    FrameControl::Suspend => {
                        log::debug!("Frame loop suspended");
                        notified.notified().await;
                        log::debug!("Frame loop resumed");
                        ticker.reset();
                    }
                    FrameControl::Stop => break,
                }
            }
        });

        Self {
            handle,
            wake,
            joined: false,
        }
    }

    /// Resume a suspended loop; a wake before the loop suspends is kept for it
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the callback to return [`FrameControl::Stop`]
    pub async fn join(&mut self) {
        if self.joined {
            return;
        }
        self.joined = true;
        match (&mut self.handle).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => log::error!("Frame loop task failed: {}", e),
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
