//! Operation Queue Service.
//!
//! Every storage call is wrapped in a unit of work and handed to an
//! [`OperationQueue`]. A queue is either serial (one worker task draining a
//! channel, so work runs in submission order) or concurrent (each unit
//! spawned onto the runtime, gated by a semaphore).
//!
//! Work is scheduled eagerly at `enqueue` time; the returned
//! [`OperationHandle`] is only the way to collect the result. Units can be
//! cancelled until they start running. A unit that is already running is
//! never interrupted.

mod join;

pub use join::{JoinError, JoinGroup, JoinSlot};

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};

/// Errors produced by the queue itself rather than by the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The unit was cancelled before it started.
    #[error("operation cancelled before execution")]
    Cancelled,
    /// The unit never reported a result: its queue went away (runtime shut
    /// down) or the unit panicked.
    #[error("operation abandoned by its queue")]
    Abandoned,
}

/// How a queue executes its units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// One unit at a time, in submission order.
    Serial,
    /// Up to the given number of units at once, no ordering guarantee.
    Concurrent(usize),
}

/// Default parallelism for concurrent queues.
pub const DEFAULT_CONCURRENCY: usize = 8;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Clone)]
enum Executor {
    Serial(mpsc::UnboundedSender<Job>),
    Concurrent(Arc<Semaphore>),
}

/// A named task queue. Cloning shares the underlying queue.
///
/// Must be created from within a tokio runtime: serial queues spawn their
/// worker on construction.
#[derive(Clone)]
pub struct OperationQueue {
    name: Arc<str>,
    mode: QueueMode,
    executor: Executor,
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl OperationQueue {
    pub fn new(name: impl Into<String>, mode: QueueMode) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let executor = match mode {
            QueueMode::Serial => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_serial(name.clone(), rx));
                Executor::Serial(tx)
            }
            QueueMode::Concurrent(limit) => {
                Executor::Concurrent(Arc::new(Semaphore::new(limit.max(1))))
            }
        };

        Self {
            name,
            mode,
            executor,
        }
    }

    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, QueueMode::Serial)
    }

    pub fn concurrent(name: impl Into<String>) -> Self {
        Self::new(name, QueueMode::Concurrent(DEFAULT_CONCURRENCY))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    /// Schedules `work` and returns a handle resolving to its result.
    ///
    /// If the unit is cancelled or abandoned, the handle resolves to the
    /// matching [`OperationError`] converted into the unit's error type.
    pub fn enqueue<F, Fut, T, E>(&self, work: F) -> OperationHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<OperationError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let queue_name = self.name.clone();

        let job: Job = Box::new(move || -> BoxFuture<'static, ()> {
            Box::pin(async move {
                if flag.load(Ordering::SeqCst) {
                    tracing::debug!(queue = %queue_name, "skipping cancelled operation");
                    let _ = tx.send(Err(E::from(OperationError::Cancelled)));
                    return;
                }
                let result = work().await;
                // The caller may have dropped its handle; the work still ran.
                let _ = tx.send(result);
            })
        });

        match &self.executor {
            Executor::Serial(sender) => {
                if sender.send(job).is_err() {
                    tracing::warn!(queue = %self.name, "serial worker is gone");
                }
            }
            Executor::Concurrent(semaphore) => {
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    if let Ok(_permit) = semaphore.acquire_owned().await {
                        job().await;
                    }
                });
            }
        }

        tracing::trace!(queue = %self.name, "operation enqueued");

        OperationHandle { rx, cancelled }
    }
}

async fn run_serial(name: Arc<str>, mut rx: mpsc::UnboundedReceiver<Job>) {
    tracing::debug!(queue = %name, "serial worker started");
    while let Some(job) = rx.recv().await {
        // A panicking unit resolves its own handle as abandoned; the worker
        // keeps serving the rest of the queue.
        if AssertUnwindSafe(async move { job().await })
            .catch_unwind()
            .await
            .is_err()
        {
            tracing::error!(queue = %name, "operation panicked");
        }
    }
    tracing::debug!(queue = %name, "serial worker stopped");
}

/// Handle to a scheduled unit of work.
///
/// Awaiting it yields the unit's result exactly once. Dropping it does not
/// cancel the unit.
#[must_use = "the operation runs regardless; await the handle to observe its result"]
pub struct OperationHandle<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
    cancelled: Arc<AtomicBool>,
}

impl<T, E> OperationHandle<T, E> {
    /// Requests cancellation. Only effective if the unit has not started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl<T, E> Future for OperationHandle<T, E>
where
    E: From<OperationError>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(OperationError::Abandoned))),
            Poll::Pending => Poll::Pending,
        }
    }
}
