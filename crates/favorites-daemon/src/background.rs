//! Tracking for detached work.
//!
//! Refresh persistence, authority seeding and audit publishing run after the
//! response value exists. A long-running daemon just lets them finish; a
//! one-shot command drains them before the runtime shuts down.

use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keep a handle until it is drained. Finished handles are pruned.
    pub fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of handles still held.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every tracked task, including ones tracked while draining.
    pub async fn drain(&self) {
        loop {
            let handles = std::mem::take(&mut *self.lock());
            if handles.is_empty() {
                return;
            }
            debug!(count = handles.len(), "Waiting for background tasks");
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Background task failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drain_waits_for_tracked_tasks() {
        let tasks = Arc::new(BackgroundTasks::new());
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.track(tokio::spawn(async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn panicking_task_does_not_stop_drain() {
        let tasks = BackgroundTasks::new();
        tasks.track(tokio::spawn(async { panic!("boom") }));
        tasks.track(tokio::spawn(async {}));

        tasks.drain().await;
        assert_eq!(tasks.pending(), 0);
    }
}
