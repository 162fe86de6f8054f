//! The seam between the protocol and the log.
//!
//! Handles are owned exclusively by the worker or orchestration task that
//! created them; they are never shared across tasks.

use crate::envelope::Envelope;
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// A subscribed reader on one topic.
#[async_trait]
pub trait MessageSource: Send {
  /// Wait up to `wait` for the next message in delivery order.
  ///
  /// `Ok(None)` means the wait elapsed with nothing to read; the caller
  /// decides whether to retry (after checking cancellation). A recoverable
  /// read failure is returned as a non-terminal error so the caller can log
  /// and keep looping; [`TransportError::EndOfStream`] is terminal.
  async fn next(&mut self, wait: Duration) -> Result<Option<Envelope>, TransportError>;

  /// Release the underlying consumer.
  fn close(&mut self) -> Result<(), TransportError>;
}

/// A writer bound to one topic.
#[async_trait]
pub trait MessageSink: Send + Sync {
  /// Durably append one message.
  async fn publish(&self, envelope: Envelope) -> Result<(), TransportError>;

  /// Release the underlying producer.
  fn close(&mut self) -> Result<(), TransportError>;
}
