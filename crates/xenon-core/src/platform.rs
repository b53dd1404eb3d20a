use std::time::Duration;

use tracing::debug;
use xenon_common::geometry::Size;

/// Poll-based window size tracker for platforms without a size-change
/// signal.
///
/// Generic over the size query so the platform layer decides how the
/// dimensions are actually read.
pub struct SizePoller<F> {
    query: F,
    current: Size,
    interval: Duration,
}

impl<F> SizePoller<F>
where
    F: FnMut() -> Size,
{
    pub fn new(mut query: F, interval: Duration) -> Self {
        let current = query();
        Self {
            query,
            current,
            interval,
        }
    }

    pub fn current(&self) -> Size {
        self.current
    }

    /// One poll: the size that changed, if it did.
    pub fn poll_once(&mut self) -> Option<Size> {
        let new_size = (self.query)();
        if new_size != self.current {
            debug!(?new_size, "window size changed");
            self.current = new_size;
            Some(new_size)
        } else {
            None
        }
    }

    /// Poll forever at the configured interval, reporting each change.
    /// Callers abort the task to stop it.
    pub async fn run(mut self, mut on_change: impl FnMut(Size)) {
        loop {
            tokio::time::sleep(self.interval).await;
            if let Some(size) = self.poll_once() {
                on_change(size);
            }
        }
    }
}
