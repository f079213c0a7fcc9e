//! Deferred, non-blocking actions (tint resets, banner dismissal).

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Tracks spawned timers so a caller can wait for all of them to fire.
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `action` after `delay` on the current runtime.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every scheduled timer, including ones scheduled while
    /// waiting, has fired.
    pub async fn settle(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            debug!(timers = batch.len(), "settling timers");
            for handle in batch {
                let _ = handle.await;
            }
        }
    }
}
