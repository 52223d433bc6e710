use super::queue::{BatchResult, ConversionJob};

/// Receives runner events. Called from worker threads, never concurrently
/// and never while the queue is locked.
pub trait BatchObserver: Send + Sync {
    /// A job reached a terminal status. `completed` counts from 1 to `total`.
    fn on_progress(&self, job: &ConversionJob, completed: usize, total: usize);

    fn on_done(&self, _result: &BatchResult) {}
}

pub struct FnObserver<P, D> {
    on_progress: P,
    on_done: D,
}

/// Builds an observer from a progress callback and a completion callback.
pub fn observer_fn<P, D>(on_progress: P, on_done: D) -> FnObserver<P, D>
where
    P: Fn(&ConversionJob, usize, usize) + Send + Sync,
    D: Fn(&BatchResult) + Send + Sync,
{
    FnObserver { on_progress, on_done }
}

impl<P, D> BatchObserver for FnObserver<P, D>
where
    P: Fn(&ConversionJob, usize, usize) + Send + Sync,
    D: Fn(&BatchResult) + Send + Sync,
{
    fn on_progress(&self, job: &ConversionJob, completed: usize, total: usize) {
        (self.on_progress)(job, completed, total)
    }

    fn on_done(&self, result: &BatchResult) {
        (self.on_done)(result)
    }
}
