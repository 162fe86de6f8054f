//! Request/response matching over two independent, unordered streams.

use crate::envelope::{Correlation, Envelope};
use crate::error::{ChannelError, StopError};
use crate::transport::{MessageSink, MessageSource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Serialize `dto` and publish it on `sink` under `key`, attaching the
/// correlation token when one is supplied.
///
/// Failures are logged and swallowed: a lost request simply means the
/// waiter will time out, which is the contract every caller already
/// handles.
pub async fn send_json<T: Serialize>(sink: &dyn MessageSink, key: &str, dto: &T, token: Option<&str>) {
  let payload = match serde_json::to_vec(dto) {
    Ok(payload) => payload,
    Err(e) => {
      error!(error = %e, key, "failed to serialize outgoing message");
      return;
    }
  };

  let mut envelope = Envelope::new(key, payload);
  if let Some(token) = token {
    envelope = envelope.with_token(token);
  }

  if let Err(e) = sink.publish(envelope).await {
    error!(error = %e, key, "failed to publish message");
  }
}

/// One request topic, one shared response topic, and the filtering needed
/// to pick this caller's responses out of everyone else's.
///
/// Every waiter on the response topic reads and discards all other
/// traffic, so the cost is O(waiters × traffic). That is a deliberate
/// simplicity trade-off of the shared-topic protocol, not something this
/// type tries to optimize away.
pub struct CorrelatedChannel {
  sink: Box<dyn MessageSink>,
  source: Box<dyn MessageSource>,
  read_wait: Duration,
}

impl CorrelatedChannel {
  pub fn new(sink: Box<dyn MessageSink>, source: Box<dyn MessageSource>) -> Self {
    Self {
      sink,
      source,
      read_wait: Duration::from_millis(500),
    }
  }

  /// Bound on a single blocking read inside the filter loop.
  pub fn with_read_wait(mut self, read_wait: Duration) -> Self {
    self.read_wait = read_wait;
    self
  }

  /// Publish a request. See [`send_json`] for the failure contract.
  pub async fn send<T: Serialize>(&self, key: &str, dto: &T, token: Option<&str>) {
    send_json(self.sink.as_ref(), key, dto, token).await;
  }

  /// Read the response stream in delivery order until a message matching
  /// `correlation` arrives, or `timeout` elapses.
  ///
  /// Non-matching messages are discarded without error; undecodable ones
  /// are logged and skipped; recoverable read errors are logged and
  /// retried. Only a timeout or a terminal stream failure is returned.
  pub async fn receive_matching<T: DeserializeOwned>(
    &mut self,
    correlation: &Correlation,
    timeout: Duration,
  ) -> Result<T, ChannelError> {
    let deadline = Instant::now() + timeout;
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        return Err(ChannelError::Timeout);
      }

      let envelope = match self.source.next(remaining.min(self.read_wait)).await {
        Ok(None) => continue,
        Ok(Some(envelope)) => envelope,
        Err(e) if e.is_terminal() => return Err(ChannelError::Transport(e)),
        Err(e) => {
          warn!(error = %e, "error receiving message");
          continue;
        }
      };

      if !correlation.matches(&envelope) {
        debug!(key = %envelope.key, "discarding message for another waiter");
        continue;
      }

      match envelope.decode::<T>() {
        Ok(dto) => return Ok(dto),
        Err(e) => {
          warn!(error = %e, key = %envelope.key, "failed to decode message, skipping");
          continue;
        }
      }
    }
  }

  /// Token-based exchange: send `dto` with a fresh correlation token and
  /// wait for the response echoing it.
  pub async fn request<Req: Serialize, Resp: DeserializeOwned>(
    &mut self,
    key: &str,
    dto: &Req,
    timeout: Duration,
  ) -> Result<Resp, ChannelError> {
    let token = uuid::Uuid::new_v4().to_string();
    self.send(key, dto, Some(&token)).await;
    self.receive_matching(&Correlation::Token(token), timeout).await
  }

  /// Release both handles, collecting every failure.
  pub fn stop(&mut self) -> Result<(), StopError> {
    let mut stop = StopError::default();
    if let Err(e) = self.sink.close() {
      stop.push(e);
    }
    if let Err(e) = self.source.close() {
      stop.push(e);
    }
    stop.into_result()
  }
}
