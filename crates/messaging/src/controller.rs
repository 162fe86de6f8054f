//! Supervision of a fixed set of workers as one cancellable unit.

use crate::error::{StopError, WorkerError};
use crate::worker::Worker;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Owns a set of [`Worker`]s and runs them concurrently with fail-fast
/// semantics: the first worker to return a non-cancellation error brings
/// the whole controller down, trading partial availability for fast
/// operator visibility.
pub struct Controller {
  workers: Vec<Box<dyn Worker>>,
}

impl Controller {
  pub fn new(workers: Vec<Box<dyn Worker>>) -> Self {
    Self { workers }
  }

  pub fn worker_count(&self) -> usize {
    self.workers.len()
  }

  /// Drive all worker loops until they finish.
  ///
  /// Each worker gets its own subscription to `shutdown`. When a worker
  /// fails, shutdown is broadcast so the remaining loops wind down, the
  /// stragglers are drained, and the first error is returned. If every
  /// worker exits cleanly after cancellation this returns `Ok(())`.
  pub async fn run(&mut self, shutdown: &broadcast::Sender<()>) -> Result<(), WorkerError> {
    let mut loops: FuturesUnordered<_> = self
      .workers
      .iter_mut()
      .map(|worker| {
        let receiver = shutdown.subscribe();
        async move {
          let name = worker.name().to_string();
          (name, worker.process(receiver).await)
        }
      })
      .collect();

    let mut first_error = None;
    while let Some((name, result)) = loops.next().await {
      match result {
        Ok(()) => info!(worker = %name, "worker stopped"),
        Err(e) => {
          error!(worker = %name, error = %e, "worker failed");
          if first_error.is_none() {
            first_error = Some(e);
            let _ = shutdown.send(());
          }
        }
      }
    }

    match first_error {
      Some(error) => Err(error),
      None => Ok(()),
    }
  }

  /// Stop every worker regardless of individual failures, merging all
  /// release errors into one.
  pub fn stop(&mut self) -> Result<(), StopError> {
    let mut combined = StopError::default();
    for worker in &mut self.workers {
      if let Err(errors) = worker.stop() {
        combined.merge(errors);
      }
    }
    combined.into_result()
  }
}
