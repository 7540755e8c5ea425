//! Bounded-concurrency request dispatcher.
//!
//! A [`Dispatcher`] owns a bounded queue, a fixed pool of worker tasks and one
//! shared HTTP client. Requests go in through [`Dispatcher::submit`]; every
//! request comes out as exactly one call to either the success or the failure
//! handler. [`Dispatcher::wait`] resolves once all submitted requests have
//! reached that point.

use crate::barrier::CompletionBarrier;
use crate::config::{DispatcherConfig, FailureHandler, SuccessHandler};
use crate::error::RequesterError;
use crate::request::Request;
use futures::future::join_all;
use reqwest::{Method, StatusCode};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Worker pool that executes HTTP requests and reports each outcome once.
///
/// Workers start as soon as the dispatcher is built and keep running until
/// [`close`](Self::close) is called.
///
/// # Example
///
/// ```rust,no_run
/// use requester_lib::{Dispatcher, DispatcherConfig, Request};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DispatcherConfig::default()
///         .with_worker_count(3)
///         .on_success(|request, body| println!("{} {} bytes", request.target(), body.len()))
///         .on_failure(|err| eprintln!("{}", err));
///
///     let dispatcher = Dispatcher::new(config)?;
///     dispatcher
///         .submit(vec![Request::get("example.com")?, Request::get("example.org")?])
///         .await?;
///     dispatcher.wait().await;
///     dispatcher.close().await;
///     Ok(())
/// }
/// ```
pub struct Dispatcher {
    /// Sending half of the queue; `None` once closed
    sender: Mutex<Option<mpsc::Sender<Request>>>,
    /// Outstanding request counter
    barrier: Arc<CompletionBarrier>,
    /// Join handles of the worker tasks
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    queue_capacity: usize,
}

/// State shared by every worker of one dispatcher.
struct WorkerContext {
    client: reqwest::Client,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Request>>,
    barrier: Arc<CompletionBarrier>,
    on_success: Option<SuccessHandler>,
    on_failure: Option<FailureHandler>,
}

impl Dispatcher {
    /// Build a dispatcher and start its workers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ClientBuildFailed` if the HTTP client cannot be created.
    pub fn new(config: DispatcherConfig) -> Result<Self, RequesterError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RequesterError::ClientBuildFailed {
                message: e.to_string(),
            })?;

        Ok(Self::with_client(config, client))
    }

    /// Build a dispatcher around a caller-supplied client.
    ///
    /// The configured `user_agent` is not applied to a supplied client.
    pub fn with_client(config: DispatcherConfig, client: reqwest::Client) -> Self {
        let worker_count = config.effective_worker_count();
        let queue_capacity = config.effective_queue_capacity();

        let (sender, receiver) = mpsc::channel(queue_capacity);
        let barrier = Arc::new(CompletionBarrier::new());

        let context = Arc::new(WorkerContext {
            client,
            receiver: tokio::sync::Mutex::new(receiver),
            barrier: Arc::clone(&barrier),
            on_success: config.on_success,
            on_failure: config.on_failure,
        });

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&context))))
            .collect();

        debug!(worker_count, queue_capacity, "dispatcher started");

        Self {
            sender: Mutex::new(Some(sender)),
            barrier,
            workers: Mutex::new(workers),
            worker_count,
            queue_capacity,
        }
    }

    /// Queue a batch of requests.
    ///
    /// Suspends while the queue is full. Each request is counted as
    /// outstanding just before it is handed to the queue, so a worker can
    /// never release a request that was not counted.
    ///
    /// Dropping the returned future mid-batch is safe: requests already
    /// queued stay counted and run, the rest are never submitted.
    ///
    /// # Errors
    ///
    /// Returns `DispatcherClosed` if the dispatcher was closed before the
    /// call. A submission already in progress finishes queueing its batch,
    /// and [`close`](Self::close) drains it.
    pub async fn submit<I>(&self, requests: I) -> Result<(), RequesterError>
    where
        I: IntoIterator<Item = Request>,
    {
        let sender = lock(&self.sender)
            .clone()
            .ok_or(RequesterError::DispatcherClosed)?;

        for request in requests {
            let permit = sender
                .reserve()
                .await
                .map_err(|_| RequesterError::DispatcherClosed)?;
            self.barrier.add(1);
            permit.send(request);
        }

        Ok(())
    }

    /// Queue a single request.
    pub async fn submit_one(&self, request: Request) -> Result<(), RequesterError> {
        self.submit(std::iter::once(request)).await
    }

    /// Wait until every submitted request has completed.
    ///
    /// Returns immediately when nothing is outstanding.
    pub async fn wait(&self) {
        self.barrier.wait().await;
    }

    /// Stop accepting work, drain the queue and join all workers.
    ///
    /// Calling it again is a no-op.
    pub async fn close(&self) {
        let sender = lock(&self.sender).take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *lock(&self.workers));
        let joined = workers.len();
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "worker task ended abnormally");
            }
        }

        info!(workers = joined, "dispatcher closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }

    /// Requests submitted but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.barrier.outstanding()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("outstanding", &self.outstanding())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// A poisoned lock only means a panic happened while it was held; the Option
// and Vec inside are still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker(id: usize, context: Arc<WorkerContext>) {
    debug!(worker = id, "worker started");

    loop {
        // the receiver lock is released as soon as one request is taken
        let next = context.receiver.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };

        let _guard = context.barrier.guard();
        debug!(worker = id, request = %request, "executing request");

        match execute(&context.client, &request).await {
            Ok(body) => {
                debug!(worker = id, target = %request.target(), bytes = body.len(), "request succeeded");
                if let Some(handler) = &context.on_success {
                    invoke("success", || handler(request, body));
                }
            }
            Err(err) => {
                debug!(worker = id, error = %err, "request failed");
                if let Some(handler) = &context.on_failure {
                    invoke("failure", || handler(err));
                }
            }
        }
    }

    debug!(worker = id, "worker stopped");
}

/// Run a handler, keeping the worker alive if it panics.
fn invoke<F: FnOnce()>(kind: &str, handler: F) {
    if panic::catch_unwind(AssertUnwindSafe(handler)).is_err() {
        error!(handler = kind, "outcome handler panicked");
    }
}

/// Execute one request and classify the outcome.
///
/// Only a 200 response counts as success; any other status is reported
/// without reading the body.
async fn execute(client: &reqwest::Client, request: &Request) -> Result<Vec<u8>, RequesterError> {
    let target = request.target().as_str();

    let method = Method::from_bytes(request.method().as_bytes())
        .map_err(|e| RequesterError::request_build(target, e.to_string()))?;

    let mut builder = client.request(method, request.target().clone());
    if request.has_body() {
        builder = builder.body(request.body().to_string());
    }
    let outbound = builder
        .build()
        .map_err(|e| RequesterError::request_build(target, e.to_string()))?;

    let response = client
        .execute(outbound)
        .await
        .map_err(|e| RequesterError::transport(target, e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(RequesterError::non_success(target, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RequesterError::body_read(target, e.to_string()))?;

    Ok(body.to_vec())
}
