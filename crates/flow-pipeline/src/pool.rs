//! Bounded worker pool for per-item requests
//!
//! Jobs are spawned onto a `JoinSet` and each waits for a semaphore permit
//! before running, so at most `permits` jobs are in flight at a time.
//! Results come back in input order. Dropping the future returned by
//! [`FetchPool::run`] aborts every outstanding job.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs that produced a value
    pub completed: usize,
    /// Jobs that panicked or were cancelled
    pub lost: usize,
}

/// Concurrency-limited job runner
#[derive(Debug, Clone)]
pub struct FetchPool {
    permits: usize,
    semaphore: Arc<Semaphore>,
}

impl FetchPool {
    /// Create a pool running at most `permits` jobs at once (minimum 1)
    #[must_use]
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            permits,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Maximum concurrent jobs
    #[inline]
    #[must_use]
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits not currently held
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `job` for every input and collect results in input order
    ///
    /// A job that panics leaves `None` in its slot.
    pub async fn run<I, T, F, Fut>(&self, inputs: Vec<I>, job: F) -> (Vec<Option<T>>, PoolStats)
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(inputs.len()).collect();
        let mut stats = PoolStats::default();
        let mut set = JoinSet::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let semaphore = self.semaphore.clone();
            let task = job(input);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, task.await)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, value)) => {
                    slots[index] = Some(value);
                    stats.completed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pool job did not complete");
                    stats.lost += 1;
                }
            }
        }

        (slots, stats)
    }
}

impl Default for FetchPool {
    /// Pool with 8 permits
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_keep_input_order() {
        let pool = FetchPool::new(3);
        let (results, stats) = pool
            .run((0..10u64).collect(), |n| async move {
                tokio::time::sleep(Duration::from_millis(10 * (10 - n))).await;
                n * 2
            })
            .await;
        let values: Vec<u64> = results.into_iter().flatten().collect();
        assert_eq!(values, (0..10).map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(stats.completed, 10);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let pool = FetchPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        pool.run((0..8).collect(), |_: i32| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn panicking_job_leaves_empty_slot() {
        let pool = FetchPool::new(2);
        let (results, stats) = pool
            .run(vec![1, 2, 3], |n: i32| async move {
                assert!(n != 2, "boom");
                n
            })
            .await;
        assert_eq!(results, vec![Some(1), None, Some(3)]);
        assert_eq!(stats, PoolStats { completed: 2, lost: 1 });
    }

    #[test]
    fn zero_permits_becomes_one() {
        assert_eq!(FetchPool::new(0).permits(), 1);
        assert_eq!(FetchPool::default().permits(), 8);
    }
}
