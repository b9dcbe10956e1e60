use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::queue::BoundedQueue;

/// Shared state between one producer and one consumer.
///
/// Owns the bounded queue, its lock, the "not empty" and "not full"
/// conditions, and the running flag. Once shutdown is signalled no new items
/// are accepted, but items already queued can still be popped.
pub struct PipelineContext<T> {
    queue: Mutex<BoundedQueue<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    running: AtomicBool,
}

impl<T> PipelineContext<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(BoundedQueue::new(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    /// Enqueue `item`, waiting for space while the queue is full.
    ///
    /// Returns the item if the pipeline shuts down before it was accepted.
    pub fn push_blocking(&self, item: T) -> Result<(), T> {
        let mut queue = self.lock();
        let mut item = item;
        loop {
            if !self.is_running() {
                return Err(item);
            }
            match queue.push(item) {
                Ok(()) => {
                    drop(queue);
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => {
                    item = rejected;
                    queue = self
                        .not_full
                        .wait(queue)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Dequeue the oldest item, waiting at most `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout, or at once when the queue is empty and the
    /// pipeline has shut down.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let queue = self.lock();
        let (mut queue, _) = self
            .not_empty
            .wait_timeout_while(queue, timeout, |q| q.is_empty() && self.is_running())
            .unwrap_or_else(PoisonError::into_inner);

        let item = queue.pop();
        drop(queue);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Stop accepting work and wake every waiter.
    pub fn shutdown(&self) {
        // Hold the lock so no waiter can miss the flag between its check and its wait.
        let _queue = self.lock();
        self.running.store(false, Ordering::SeqCst);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    fn lock(&self) -> MutexGuard<'_, BoundedQueue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

trait Stop: Send + Sync {
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

impl<T: Send> Stop for PipelineContext<T> {
    fn stop(&self) {
        self.shutdown();
    }

    fn is_stopped(&self) -> bool {
        !self.is_running()
    }
}

/// Cloneable handle that stops a pipeline from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    target: Arc<dyn Stop>,
}

impl ShutdownHandle {
    pub fn new<T: Send + 'static>(context: Arc<PipelineContext<T>>) -> Self {
        Self { target: context }
    }

    pub fn shutdown(&self) {
        self.target.stop();
    }

    pub fn is_shutdown(&self) -> bool {
        self.target.is_stopped()
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn producer_blocks_until_consumer_frees_a_slot() {
        let ctx = PipelineContext::new(2);
        let pushed = AtomicUsize::new(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..3 {
                    ctx.push_blocking(i).unwrap();
                    pushed.fetch_add(1, Ordering::SeqCst);
                }
            });

            let deadline = Instant::now() + Duration::from_secs(5);
            while pushed.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(50));
            assert_eq!(pushed.load(Ordering::SeqCst), 2);
            assert_eq!(ctx.len(), 2);

            assert_eq!(ctx.pop_timeout(Duration::from_secs(1)), Some(0));
        });

        assert_eq!(pushed.load(Ordering::SeqCst), 3);
        assert_eq!(ctx.pop_timeout(Duration::ZERO), Some(1));
        assert_eq!(ctx.pop_timeout(Duration::ZERO), Some(2));
    }

    #[test]
    fn pop_times_out_on_empty_queue() {
        let ctx: PipelineContext<u8> = PipelineContext::new(4);
        let started = Instant::now();
        assert_eq!(ctx.pop_timeout(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(ctx.is_running());
    }

    #[test]
    fn shutdown_wakes_blocked_producer() {
        let ctx = PipelineContext::new(1);
        ctx.push_blocking(1u32).unwrap();

        thread::scope(|scope| {
            let producer = scope.spawn(|| ctx.push_blocking(2));
            thread::sleep(Duration::from_millis(20));
            ctx.shutdown();
            assert_eq!(producer.join().unwrap(), Err(2));
        });
    }

    #[test]
    fn queued_items_drain_after_shutdown() {
        let ctx = PipelineContext::new(4);
        ctx.push_blocking('a').unwrap();
        ctx.push_blocking('b').unwrap();
        ctx.shutdown();

        assert_eq!(ctx.push_blocking('c'), Err('c'));
        assert_eq!(ctx.pop_timeout(Duration::from_secs(1)), Some('a'));
        assert_eq!(ctx.pop_timeout(Duration::from_secs(1)), Some('b'));

        let started = Instant::now();
        assert_eq!(ctx.pop_timeout(Duration::from_secs(5)), None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn handle_stops_context_from_another_thread() {
        let ctx = Arc::new(PipelineContext::<u8>::new(1));
        let handle = ShutdownHandle::new(Arc::clone(&ctx));
        assert!(!handle.is_shutdown());

        let remote = handle.clone();
        thread::spawn(move || remote.shutdown()).join().unwrap();

        assert!(handle.is_shutdown());
        assert!(!ctx.is_running());
    }
}
