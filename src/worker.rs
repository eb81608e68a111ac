//! Serial write worker.
//!
//! All mutating graph engine calls go through a single [`SerialWorker`]. It
//! owns an unbounded FIFO queue and one consumer task that runs each job to
//! completion before taking the next, so at most one write reaches the
//! engine at any instant and jobs run in submission order.
//!
//! ```text
//!   Stopped ──start()──▶ Running ──stop()──▶ Draining ──▶ Stopped
//! ```
//!
//! Submitting a job only enqueues it. The HTTP response is sent before the
//! job runs, so a failing job can only be reported through the log.
//!
//! # Shutdown
//!
//! [`SerialWorker::stop`] aborts the consumer task, which cancels the job in
//! flight at its next await point, waits for the task to finish and then
//! discards every job still queued without running it. Delivery across a
//! shutdown is therefore at most once.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

/// A deferred unit of work. Nothing runs until the worker polls it.
pub type Job = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

struct QueuedJob {
    label: String,
    job: Job,
}

/// Lifecycle state of a [`SerialWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Running,
    Draining,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("write worker is not running")]
    NotRunning,
    #[error("write worker has already been started")]
    AlreadyStarted,
}

struct Inner {
    state: WorkerState,
    started: bool,
    sender: Option<UnboundedSender<QueuedJob>>,
    consumer: Option<JoinHandle<()>>,
}

/// Single-consumer FIFO job queue.
pub struct SerialWorker {
    inner: Mutex<Inner>,
    receiver: Arc<AsyncMutex<UnboundedReceiver<QueuedJob>>>,
}

/// Aborts the wrapped task when dropped, so cancelling the consumer also
/// cancels the job it is waiting on.
struct AbortOnDrop(JoinHandle<anyhow::Result<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl SerialWorker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            inner: Mutex::new(Inner {
                state: WorkerState::Stopped,
                started: false,
                sender: Some(sender),
                consumer: None,
            }),
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lock().unwrap().state
    }

    /// Spawn the consumer task on the current tokio runtime.
    ///
    /// A worker can be started once; it cannot be restarted after [`stop`](Self::stop).
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.started {
            return Err(WorkerError::AlreadyStarted);
        }
        let receiver = self.receiver.clone();
        inner.consumer = Some(tokio::spawn(consume(receiver)));
        inner.started = true;
        inner.state = WorkerState::Running;
        tracing::info!("write worker started");
        Ok(())
    }

    /// Enqueue a job. Returns once the job is queued, not once it has run.
    pub fn submit<F>(&self, label: impl Into<String>, job: F) -> Result<(), WorkerError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let inner = self.inner.lock().unwrap();
        let sender = match (inner.state, &inner.sender) {
            (WorkerState::Running, Some(sender)) => sender,
            _ => return Err(WorkerError::NotRunning),
        };
        sender
            .send(QueuedJob {
                label: label.into(),
                job: Box::pin(job),
            })
            .map_err(|_| WorkerError::NotRunning)
    }

    /// Cancel the consumer, wait for it to exit, then drop queued jobs.
    ///
    /// Calling `stop` on a worker that is not running does nothing.
    pub async fn stop(&self) {
        let consumer = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != WorkerState::Running {
                return;
            }
            inner.state = WorkerState::Draining;
            inner.sender = None;
            inner.consumer.take()
        };

        if let Some(consumer) = consumer {
            consumer.abort();
            match consumer.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!(error = %e, "write worker task panicked"),
            }
        }

        let mut dropped = 0usize;
        {
            let mut receiver = self.receiver.lock().await;
            while let Ok(job) = receiver.try_recv() {
                tracing::debug!(job = %job.label, "discarding queued write job");
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "write worker stopped with jobs still queued; they were discarded");
        }

        self.inner.lock().unwrap().state = WorkerState::Stopped;
        tracing::info!("write worker stopped");
    }
}

impl Default for SerialWorker {
    fn default() -> Self {
        Self::new()
    }
}

async fn consume(receiver: Arc<AsyncMutex<UnboundedReceiver<QueuedJob>>>) {
    let mut receiver = receiver.lock().await;
    while let Some(QueuedJob { label, job }) = receiver.recv().await {
        tracing::debug!(job = %label, "running write job");
        // Each job runs in its own task so a panic is contained to that job.
        let mut running = AbortOnDrop(tokio::spawn(job));
        match (&mut running.0).await {
            Ok(Ok(())) => tracing::debug!(job = %label, "write job finished"),
            Ok(Err(err)) => {
                tracing::error!(job = %label, error = %format!("{:#}", err), "write job failed")
            }
            Err(err) => tracing::error!(job = %label, error = %err, "write job panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn explode() -> anyhow::Result<()> {
        panic!("boom")
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "timed out waiting for {} jobs, saw {}",
            expected,
            counter.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_submit_before_start_is_rejected() {
        let worker = SerialWorker::new();
        let err = worker.submit("early", async { Ok(()) }).unwrap_err();
        assert_eq!(err, WorkerError::NotRunning);
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let worker = SerialWorker::new();
        worker.start().unwrap();
        assert_eq!(worker.start(), Err(WorkerError::AlreadyStarted));
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..20 {
            let order = order.clone();
            let done = done.clone();
            worker
                .submit(format!("job {}", i), async move {
                    // Later jobs sleep less; only serial execution keeps order.
                    tokio::time::sleep(Duration::from_millis(20 - i)).await;
                    order.lock().unwrap().push(i);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        wait_for(&done, 20).await;
        assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<u64>>());
        worker.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_runs_two_jobs_at_once() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..10 {
            let active = active.clone();
            let max_active = max_active.clone();
            let done = done.clone();
            worker
                .submit(format!("job {}", i), async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(3)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        wait_for(&done, 10).await;
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_worker() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let done = Arc::new(AtomicUsize::new(0));
        worker
            .submit("failing", async {
                Err::<(), _>(anyhow::anyhow!("engine down"))
            })
            .unwrap();
        worker.submit("panicking", async { explode() }).unwrap();
        let counter = done.clone();
        worker
            .submit("after", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        wait_for(&done, 1).await;
        assert_eq!(worker.state(), WorkerState::Running);
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_stop_discards_queued_jobs() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let (started_tx, started_rx) = oneshot::channel::<()>();
        worker
            .submit("blocking", async move {
                let _ = started_tx.send(());
                std::future::pending::<()>().await;
                Ok(())
            })
            .unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        for i in 0..5 {
            let ran = ran.clone();
            worker
                .submit(format!("queued {}", i), async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        started_rx.await.unwrap();
        worker.stop().await;

        assert_eq!(worker.state(), WorkerState::Stopped);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(
            worker.submit("late", async { Ok(()) }),
            Err(WorkerError::NotRunning)
        );
    }

    #[tokio::test]
    async fn test_stop_keeps_completed_effects() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();
        worker
            .submit("one", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        wait_for(&done, 1).await;

        worker.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_releases_queue_for_draining() {
        let worker = SerialWorker::new();
        worker.start().unwrap();

        let (started_tx, started_rx) = oneshot::channel::<()>();
        worker
            .submit("blocking", async move {
                let _ = started_tx.send(());
                std::future::pending::<()>().await;
                Ok(())
            })
            .unwrap();
        worker.submit("queued", async { Ok(()) }).unwrap();
        started_rx.await.unwrap();

        // Abort alone must free the receiver; stop() would hang otherwise.
        tokio::time::timeout(Duration::from_secs(1), worker.stop())
            .await
            .expect("stop did not finish");
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(worker.receiver.lock().await.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_on_stopped_worker_is_noop() {
        let worker = SerialWorker::new();
        worker.stop().await;
        assert_eq!(worker.state(), WorkerState::Stopped);
    }
}
