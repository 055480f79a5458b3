use log::warn;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinSet;

/// Best-effort work detached from the response path.
///
/// Spawned tasks run on the current Tokio runtime; nothing waits for them
/// except [`drain`](Self::drain), which the daemon calls on shutdown and tests
/// call to observe completed writes. Failures are logged and otherwise lost.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.lock();
        // Reap finished tasks so the set does not grow without bound.
        while let Some(result) = set.try_join_next() {
            if let Err(e) = result {
                warn!("Background task failed: {}", e);
            }
        }
        set.spawn(task);
    }

    /// Tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Waits for every outstanding task. Returns how many were awaited.
    pub async fn drain(&self) -> usize {
        let mut set = std::mem::take(&mut *self.lock());
        let mut drained = 0;
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!("Background task failed: {}", e);
            }
            drained += 1;
        }
        drained
    }
}
