use std::future::Future;
use tokio::task::JoinHandle;

/// Handle to a spawned periodic task. The task stops on `stop()` or when
/// the handle is dropped.
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "Starting background task");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Aborts the task. `is_running` turns false once the runtime has
    /// processed the cancellation.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        tracing::debug!(task = self.name, "Stopping background task");
        self.handle.abort();
    }
}
