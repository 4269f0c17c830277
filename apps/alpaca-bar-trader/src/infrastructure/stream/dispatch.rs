//! Dispatch Pool
//!
//! Bounded worker pool that takes raw frames off the transport task and
//! runs classification plus event handling concurrently.
//!
//! One worker processes a whole frame, so events from the same frame are
//! handled in array order; frames picked up by different workers may
//! interleave freely. `submit` only awaits channel enqueue and never
//! blocks the transport read path on handler work.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Capacity of the frame queue between the transport and the workers.
const FRAME_QUEUE_CAPACITY: usize = 1024;

/// Errors from the dispatch pool.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The pool has shut down and no longer accepts frames.
    #[error("dispatch pool is closed")]
    Closed,
}

/// Handles one raw text frame (classification plus event handling).
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    /// Process one frame to completion.
    async fn handle(&self, payload: String);
}

/// Fixed-size pool of tokio worker tasks sharing one frame queue.
pub struct DispatchPool {
    frame_tx: Mutex<Option<mpsc::Sender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DispatchPool {
    /// Spawn a pool of `size` workers (clamped to at least 1) feeding
    /// frames to `handler`.
    #[must_use]
    pub fn new(size: usize, handler: Arc<dyn FrameHandler>) -> Self {
        let size = size.max(1);
        let (frame_tx, frame_rx) = mpsc::channel::<String>(FRAME_QUEUE_CAPACITY);
        let frame_rx = Arc::new(Mutex::new(frame_rx));

        let workers = (0..size)
            .map(|worker| {
                let frame_rx = Arc::clone(&frame_rx);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    loop {
                        // Hold the receiver lock only for the dequeue so
                        // siblings can pick up the next frame while this
                        // worker is still handling.
                        let frame = frame_rx.lock().await.recv().await;
                        match frame {
                            Some(payload) => handler.handle(payload).await,
                            None => {
                                tracing::debug!(worker, "frame queue closed, worker exiting");
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        Self {
            frame_tx: Mutex::new(Some(frame_tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Recommended pool size: host parallelism, minimum 1.
    #[must_use]
    pub fn recommended_size() -> usize {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Enqueue a frame for handling.
    ///
    /// Awaits only queue capacity, never handler completion.
    pub async fn submit(&self, payload: String) -> Result<(), DispatchError> {
        let frame_tx = self
            .frame_tx
            .lock()
            .await
            .clone()
            .ok_or(DispatchError::Closed)?;
        frame_tx
            .send(payload)
            .await
            .map_err(|_| DispatchError::Closed)
    }

    /// Close the queue and wait for every in-flight frame to finish.
    ///
    /// Frames already accepted by [`submit`](Self::submit) are handled
    /// to completion; later submissions fail with
    /// [`DispatchError::Closed`]. Safe to call more than once.
    pub async fn close_and_join(&self) {
        self.frame_tx.lock().await.take();
        let workers: Vec<_> = {
            let mut workers = self.workers.lock().await;
            workers.drain(..).collect()
        };
        for worker in workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl FrameHandler for CountingHandler {
        async fn handle(&self, _payload: String) {
            // Yield so frames actually interleave across workers.
            tokio::task::yield_now().await;
            self.handled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn every_submitted_frame_is_handled_exactly_once() {
        let handler = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        let pool = DispatchPool::new(4, Arc::clone(&handler) as Arc<dyn FrameHandler>);

        for i in 0..200 {
            pool.submit(format!("frame-{i}")).await.unwrap();
        }
        pool.close_and_join().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 200);
    }

    #[tokio::test]
    async fn zero_size_is_clamped_to_one_worker() {
        let handler = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        let pool = DispatchPool::new(0, Arc::clone(&handler) as Arc<dyn FrameHandler>);

        pool.submit("frame".to_string()).await.unwrap();
        pool.close_and_join().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 1);
    }

    struct SlowHandler {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl FrameHandler for SlowHandler {
        async fn handle(&self, _payload: String) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.handled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn close_waits_for_already_queued_frames() {
        let handler = Arc::new(SlowHandler {
            handled: AtomicUsize::new(0),
        });
        let pool = DispatchPool::new(2, Arc::clone(&handler) as Arc<dyn FrameHandler>);

        for i in 0..8 {
            pool.submit(format!("frame-{i}")).await.unwrap();
        }
        pool.close_and_join().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn submit_after_close_is_rejected() {
        let handler = Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
        });
        let pool = DispatchPool::new(1, Arc::clone(&handler) as Arc<dyn FrameHandler>);

        pool.close_and_join().await;

        let err = pool.submit("frame".to_string()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
        assert_eq!(handler.handled.load(Ordering::SeqCst), 0);

        // Closing again is a no-op.
        pool.close_and_join().await;
    }

    #[test]
    fn recommended_size_is_at_least_one() {
        assert!(DispatchPool::recommended_size() >= 1);
    }
}
