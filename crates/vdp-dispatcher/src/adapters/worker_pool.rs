//! # Worker Pool
//!
//! Bounded pool shared by every connection. Each dispatch job takes a
//! semaphore permit and runs on tokio's blocking thread pool, so a
//! synchronous operation may block its worker. Jobs beyond the pool size wait
//! in FIFO order for a permit.
//!
//! The wait queue is unbounded: `submit` never blocks and never refuses a
//! job, and each queued job holds a parked tokio task until a permit frees
//! up. Under sustained overload the queue grows without limit. Callers that
//! need backpressure watch `queued()` (also exported as the
//! `WORKER_QUEUE_DEPTH` gauge) and stop reading from their connection while
//! it stays high.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};
use vdp_telemetry::WORKER_QUEUE_DEPTH;

/// Pool construction failures.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Created outside a tokio runtime.
    #[error("worker pool requires a tokio runtime: {0}")]
    NoRuntime(String),

    /// Zero workers requested.
    #[error("worker pool size must be at least 1")]
    ZeroSize,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

/// Bounded pool of dispatch workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
    size: usize,
    handle: Handle,
}

impl WorkerPool {
    /// Create a pool of `size` workers on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails outside a runtime or for `size == 0`.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let handle = Handle::try_current().map_err(|e| PoolError::NoRuntime(e.to_string()))?;
        Self::with_handle(size, handle)
    }

    /// Create a pool of `size` workers on the given runtime.
    ///
    /// # Errors
    ///
    /// Fails for `size == 0`.
    pub fn with_handle(size: usize, handle: Handle) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(size)),
            counters: Arc::new(Counters::default()),
            size,
            handle,
        })
    }

    /// Queue a job. Returns immediately, however long the queue already is.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let counters = Arc::clone(&self.counters);
        counters.queued.fetch_add(1, Ordering::SeqCst);
        WORKER_QUEUE_DEPTH.inc();

        self.handle.spawn(async move {
            let permit = permits.acquire_owned().await;
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            WORKER_QUEUE_DEPTH.dec();

            let Ok(_permit) = permit else {
                warn!("Worker pool shut down, dropping queued job");
                return;
            };

            counters.active.fetch_add(1, Ordering::SeqCst);
            let outcome = tokio::task::spawn_blocking(job).await;
            counters.active.fetch_sub(1, Ordering::SeqCst);

            match outcome {
                Ok(()) => debug!("Worker job finished"),
                Err(e) => error!(error = %e, "Worker job failed"),
            }
        });
    }

    /// Jobs waiting for a worker. This is the pool's backpressure signal.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stop accepting queued jobs. Running jobs finish; queued ones are dropped.
    pub fn shutdown(&self) {
        self.permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(WorkerPool::new(2), Err(PoolError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(PoolError::ZeroSize)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_jobs() {
        let pool = WorkerPool::new(2).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..5 {
            let tx = tx.clone();
            pool.submit(move || {
                let _ = tx.send(i);
            });
        }
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_by_size() {
        let pool = WorkerPool::new(1).unwrap();
        let gate = Arc::new(Barrier::new(2));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let first_gate = Arc::clone(&gate);
        let first_tx = tx.clone();
        pool.submit(move || {
            let _ = first_tx.send("first started");
            first_gate.wait();
        });
        assert_eq!(rx.recv().await, Some("first started"));

        pool.submit(move || {
            let _ = tx.send("second ran");
        });

        // Second job waits behind the blocked first one.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.queued(), 1);
        assert!(rx.try_recv().is_err());

        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();
        assert_eq!(rx.recv().await, Some("second ran"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_queue_grows_then_drains() {
        let pool = WorkerPool::new(1).unwrap();
        let gate = Arc::new(Barrier::new(2));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let first_gate = Arc::clone(&gate);
        let first_tx = tx.clone();
        pool.submit(move || {
            let _ = first_tx.send(0);
            first_gate.wait();
        });
        assert_eq!(rx.recv().await, Some(0));

        for i in 1..=20 {
            let tx = tx.clone();
            pool.submit(move || {
                let _ = tx.send(i);
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.queued(), 20);

        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();
        for _ in 1..=20 {
            rx.recv().await.unwrap();
        }
        assert_eq!(pool.queued(), 0);
    }
}
