use std::sync::atomic::{AtomicUsize, Ordering};

/// Decides when a periodic checkpoint is due
///
/// A checkpoint is due each time the count of newly visited URLs enters a new
/// multiple of the interval. Counts may be reported out of order by concurrent
/// workers; whichever worker first reports a count in a new bucket wins, so no
/// multiple is skipped and none fires twice.
#[derive(Debug)]
pub struct CheckpointSchedule {
    interval: usize,
    last_bucket: AtomicUsize,
}

impl CheckpointSchedule {
    /// Creates a schedule; an interval of 0 disables periodic checkpoints
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            last_bucket: AtomicUsize::new(0),
        }
    }

    /// Records a newly visited count and returns true if it crossed a multiple
    pub fn crossed(&self, visited: usize) -> bool {
        if self.interval == 0 {
            return false;
        }

        let bucket = visited / self.interval;
        bucket > 0 && self.last_bucket.fetch_max(bucket, Ordering::SeqCst) < bucket
    }
}
