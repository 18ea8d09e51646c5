//! Counting admission gate for batch jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounds how many jobs of a batch execute at once.
///
/// Waiters are served in FIFO order, so no job starves under contention.
/// One limiter is built per batch run and shared by reference with its tasks.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Authorization for one job to execute. Released on drop.
#[derive(Debug)]
pub struct LimiterPermit {
    in_flight: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is released.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a permit. Never times out on its own.
    ///
    /// The semaphore is private and never closed, so this only errors if that
    /// invariant is broken.
    pub async fn acquire(&self) -> Result<LimiterPermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(LimiterPermit { in_flight: Arc::clone(&self.in_flight), _permit: permit })
    }

    /// Return a permit, waking the longest-waiting acquirer.
    pub fn release(&self, permit: LimiterPermit) {
        drop(permit);
    }

    /// Configured number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time so far.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[test]
    fn test_starts_with_full_capacity() {
        let limiter = ConcurrencyLimiter::new(4);
        assert_eq!(limiter.capacity(), 4);
        assert_eq!(limiter.available(), 4);
        assert_eq!(limiter.in_flight(), 0);

        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConcurrencyLimiter::new(2);
        let first = limiter.acquire().await.unwrap();
        let second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
        assert_eq!(limiter.in_flight(), 2);

        limiter.release(first);
        assert_eq!(limiter.available(), 1);
        drop(second);
        assert_eq!(limiter.available(), 2);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let limiter = Arc::new(ConcurrencyLimiter::new(3));
        let mut handles = Vec::new();

        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                let permit = limiter.acquire().await.unwrap();
                assert!(limiter.in_flight() <= 3);
                tokio::time::sleep(Duration::from_millis(5)).await;
                limiter.release(permit);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(limiter.peak_in_flight() <= 3);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test]
    async fn test_waiters_are_served_in_fifo_order() {
        let limiter = Arc::new(ConcurrencyLimiter::new(1));
        let order = Arc::new(Mutex::new(Vec::new()));
        let held = limiter.acquire().await.unwrap();

        let mut handles = Vec::new();
        for id in 0..4 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let permit = limiter.acquire().await.unwrap();
                order.lock().await.push(id);
                limiter.release(permit);
            }));
            // Let each waiter enqueue before the next one is spawned.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        limiter.release(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().await, vec![0, 1, 2, 3]);
    }
}
