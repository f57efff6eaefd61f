//! Bounded fetch pipeline
//!
//! A fixed pool of worker tasks pulls ids from one bounded job queue, runs
//! the fetch function and pushes results to the consumer in completion
//! order. The first failure, from a worker or from the id stream, stops the
//! dispatch of new ids; fetches already running are allowed to finish and
//! their results are still delivered. Cancelling the token given with
//! [`FetchPipeline::with_cancellation`] abandons running fetches as well.

use crate::error::{Error, Result};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 4;

/// Results of a completed pipeline run
#[derive(Debug)]
pub struct Fetched<T> {
    /// Successful results in completion order
    pub items: Vec<T>,
    /// First failure (wrapped in [`Error::AggregateFetch`]) or [`Error::Cancelled`]
    pub error: Option<Error>,
}

impl<T> Fetched<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Items if nothing failed, the recorded error otherwise.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}

/// Handle on a running pipeline
pub struct FetchStream<T> {
    results: mpsc::Receiver<T>,
    driver: JoinHandle<Option<Error>>,
}

impl<T> FetchStream<T> {
    /// Next result; `None` once all workers are done.
    pub async fn next(&mut self) -> Option<T> {
        self.results.recv().await
    }

    /// Stop consuming and wait for the pipeline to wind down. Results not
    /// yet received are dropped.
    pub async fn finish(self) -> Option<Error> {
        drop(self.results);
        match self.driver.await {
            Ok(error) => error,
            Err(e) => Some(Error::AggregateFetch(Box::new(Error::Transport(
                anyhow::anyhow!("fetch pipeline task failed: {e}"),
            )))),
        }
    }

    /// Receive every result, then report the outcome.
    pub async fn collect(mut self) -> Fetched<T> {
        let mut items = Vec::new();
        while let Some(item) = self.results.recv().await {
            items.push(item);
        }
        let error = self.finish().await;
        Fetched { items, error }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct FetchPipeline {
    workers: usize,
    cancel: CancellationToken,
}

impl Default for FetchPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl FetchPipeline {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the pipeline, including running fetches, when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start the pipeline. Must be called within a tokio runtime.
    pub fn spawn<S, F, Fut, T>(&self, ids: S, fetch: F) -> FetchStream<T>
    where
        S: Stream<Item = Result<String>> + Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel(self.workers * 2);
        let driver = tokio::spawn(drive(
            self.workers,
            self.cancel.clone(),
            ids,
            Arc::new(fetch),
            result_tx,
        ));
        FetchStream {
            results: result_rx,
            driver,
        }
    }

    /// Run the pipeline to completion.
    pub async fn fetch_all<S, F, Fut, T>(&self, ids: S, fetch: F) -> Fetched<T>
    where
        S: Stream<Item = Result<String>> + Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(ids, fetch).collect().await
    }
}

/// Feeds the job queue from the id stream and joins the workers.
async fn drive<S, F, Fut, T>(
    workers: usize,
    cancel: CancellationToken,
    ids: S,
    fetch: Arc<F>,
    results: mpsc::Sender<T>,
) -> Option<Error>
where
    S: Stream<Item = Result<String>> + Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    // stops dispatching; fired by the first failure or by the caller's token
    let stop = cancel.child_token();
    let failure: Arc<OnceLock<Error>> = Arc::new(OnceLock::new());
    let (job_tx, job_rx) = mpsc::channel::<String>(workers * 2);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut tasks = JoinSet::new();
    for worker in 0..workers {
        tasks.spawn(work(
            worker,
            job_rx.clone(),
            fetch.clone(),
            results.clone(),
            stop.clone(),
            cancel.clone(),
            failure.clone(),
        ));
    }
    drop(job_rx);
    drop(results);

    let mut ids = Box::pin(ids);
    loop {
        let next = tokio::select! {
            _ = stop.cancelled() => break,
            next = ids.next() => next,
        };
        match next {
            Some(Ok(id)) => {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    sent = job_tx.send(id) => {
                        // all workers are gone
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                record(&failure, &stop, e);
                break;
            }
            None => break,
        }
    }
    drop(job_tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            record(
                &failure,
                &stop,
                Error::Transport(anyhow::anyhow!("fetch worker failed: {e}")),
            );
        }
    }

    if cancel.is_cancelled() {
        return Some(Error::Cancelled);
    }
    Arc::into_inner(failure)
        .and_then(OnceLock::into_inner)
        .map(|first| Error::AggregateFetch(Box::new(first)))
}

async fn work<F, Fut, T>(
    worker: usize,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    fetch: Arc<F>,
    results: mpsc::Sender<T>,
    stop: CancellationToken,
    cancel: CancellationToken,
    failure: Arc<OnceLock<Error>>,
) where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    loop {
        if stop.is_cancelled() {
            break;
        }

        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                _ = stop.cancelled() => None,
                job = jobs.recv() => job,
            }
        };
        let Some(id) = job else {
            break;
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = fetch(id.clone()) => outcome,
        };

        match outcome {
            Ok(item) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = results.send(item) => {
                        // consumer is gone, nothing left to deliver to
                        if sent.is_err() {
                            stop.cancel();
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Worker {} failed to fetch {}: {}", worker, id, e);
                record(&failure, &stop, e);
                break;
            }
        }
    }
    tracing::trace!("Worker {} stopped", worker);
}

fn record(failure: &OnceLock<Error>, stop: &CancellationToken, error: Error) {
    if let Err(later) = failure.set(error) {
        tracing::debug!("Dropping subsequent fetch error: {}", later);
    }
    stop.cancel();
}
