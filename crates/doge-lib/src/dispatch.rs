// ============================
// doge-lib/src/dispatch.rs
// ============================
//! Bounded worker pool for outbound message dispatch.
//!
//! Sizing is static: decided once at construction, clamped to the configured
//! bounds, never resized at runtime.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, Mutex};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A fixed-size pool of worker tasks draining one shared job queue. At most
/// `workers` jobs run concurrently, regardless of how many are queued.
#[derive(Clone)]
pub struct DispatchPool {
    tx: mpsc::Sender<Job>,
    workers: usize,
}

impl DispatchPool {
    /// Spawn a pool sized to the host parallelism, clamped to `[min, max]`.
    pub fn new(min: usize, max: usize) -> Self {
        let workers = thread::available_parallelism()
            .map_or(min, std::num::NonZeroUsize::get)
            .clamp(min, max);
        Self::with_workers(workers)
    }

    /// Spawn a pool with an exact worker count.
    pub fn with_workers(workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(1024);
        let rx = Arc::new(Mutex::new(rx));

        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    // hold the lock only while dequeuing, not while running
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
            });
        }

        Self { tx, workers }
    }

    /// Number of workers this pool was built with
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Enqueue an outbound send. Backpressure: waits for queue capacity.
    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // send only fails once every worker is gone, i.e. at shutdown
        if self.tx.send(Box::pin(job)).await.is_err() {
            tracing::debug!("dispatch pool is shut down, dropping job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn pool_size_is_clamped() {
        let cores = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let expected = cores.clamp(4, 10);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let _guard = rt.enter();
        let pool = DispatchPool::new(4, 10);
        assert_eq!(pool.workers(), expected);
        assert!(pool.workers() >= 4);
        assert!(pool.workers() <= 10);
    }

    #[tokio::test]
    async fn all_submitted_jobs_run() {
        let pool = DispatchPool::with_workers(4);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..32 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while done.load(Ordering::SeqCst) < 32 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs did not complete in time");
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_worker_count() {
        let pool = DispatchPool::with_workers(4);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.submit(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while done.load(Ordering::SeqCst) < 20 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs did not complete in time");

        assert!(peak.load(Ordering::SeqCst) <= 4);
    }
}
