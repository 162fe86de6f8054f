//! The unit of continuous, cancellable message processing.

use crate::error::{StopError, WorkerError};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// A processing loop bound to one or more topics.
///
/// The loop contract: check the shutdown signal on every iteration, keep
/// every blocking read bounded, log and retry recoverable read/decode
/// failures, and return [`WorkerError::Terminal`] only when the stream is
/// gone for good. Observing shutdown is a clean `Ok(())` exit.
#[async_trait]
pub trait Worker: Send {
  /// Stable name used in supervision logs.
  fn name(&self) -> &str;

  /// Run until shutdown is observed or a terminal error occurs. All side
  /// effects go through the worker's own producer handles.
  async fn process(&mut self, shutdown: broadcast::Receiver<()>) -> Result<(), WorkerError>;

  /// Release the underlying consumer/producer handles, collecting every
  /// release failure instead of stopping at the first.
  fn stop(&mut self) -> Result<(), StopError>;
}

/// Non-blocking check of a shutdown receiver, for use at the top of a
/// worker loop iteration. A closed channel counts as shutdown: if the
/// process-side sender is gone there is nobody left to run for.
pub fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
  !matches!(shutdown.try_recv(), Err(broadcast::error::TryRecvError::Empty))
}
