//! Background eviction for the in-process stores.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle for a background sweep task. Dropping the handle aborts the
/// task, so teardown is tied to the owning component's lifetime.
#[derive(Debug)]
pub struct SweeperHandle(JoinHandle<()>);

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawn a periodic sweep. `tick` returns false when the swept component
/// is gone and the task should exit.
pub(crate) fn spawn_sweeper<F>(period: Duration, tick: F) -> SweeperHandle
where
    F: Fn() -> bool + Send + 'static,
{
    SweeperHandle(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            if !tick() {
                break;
            }
        }
    }))
}
