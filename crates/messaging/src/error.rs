use std::fmt;
use thiserror::Error;

/// Infrastructure-level failures. These are logged and retried (or
/// swallowed, for publishes) and never surface to remote callers.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("kafka error: {0}")]
  Kafka(#[from] rdkafka::error::KafkaError),

  #[error("publish failed: {0}")]
  Publish(String),

  /// The stream is gone for good; the worker must give up.
  #[error("end of stream")]
  EndOfStream,
}

impl TransportError {
  /// Terminal errors propagate out of a worker loop instead of being retried.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::EndOfStream)
  }
}

/// What a waiter on a correlated channel can observe: a timeout, or a
/// terminal transport failure. Decode errors and recoverable read errors
/// are logged and skipped inside the loop, never returned.
#[derive(Debug, Error)]
pub enum ChannelError {
  #[error("timed out waiting for a matching message")]
  Timeout,

  #[error(transparent)]
  Transport(#[from] TransportError),
}

/// Why a worker's processing loop ended abnormally.
#[derive(Debug, Error)]
pub enum WorkerError {
  #[error("message stream ended: {0}")]
  Terminal(#[source] TransportError),
}

/// Every handle-release failure from a worker (or a whole controller),
/// collected rather than stopping at the first.
#[derive(Debug, Default)]
pub struct StopError {
  errors: Vec<TransportError>,
}

impl StopError {
  pub fn push(&mut self, error: TransportError) {
    self.errors.push(error);
  }

  pub fn merge(&mut self, mut other: StopError) {
    self.errors.append(&mut other.errors);
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn errors(&self) -> &[TransportError] {
    &self.errors
  }

  /// `Ok(())` when nothing failed, otherwise the collected errors.
  pub fn into_result(self) -> Result<(), StopError> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for StopError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "failed to release {} handle(s): ", self.errors.len())?;
    for (i, error) in self.errors.iter().enumerate() {
      if i > 0 {
        write!(f, "; ")?;
      }
      write!(f, "{error}")?;
    }
    Ok(())
  }
}

impl std::error::Error for StopError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_stop_error_is_ok() {
    assert!(StopError::default().into_result().is_ok());
  }

  #[test]
  fn test_stop_error_collects_all() {
    let mut stop = StopError::default();
    stop.push(TransportError::EndOfStream);
    stop.push(TransportError::Publish("broker unreachable".to_string()));

    let mut merged = StopError::default();
    merged.merge(stop);
    assert_eq!(merged.errors().len(), 2);

    let message = merged.to_string();
    assert!(message.contains("2 handle(s)"));
    assert!(message.contains("end of stream"));
    assert!(message.contains("broker unreachable"));
  }

  #[test]
  fn test_terminal_classification() {
    assert!(TransportError::EndOfStream.is_terminal());
    assert!(!TransportError::Publish("x".to_string()).is_terminal());
  }
}
