//! In-process transport.
//!
//! A [`MemoryBus`] maps topic names to broadcast channels, so every source
//! on a topic observes all of its traffic, the same broadcast-filter model
//! the broker-backed transport has. Used by tests and local development.

use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::transport::{MessageSink, MessageSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::trace;

const TOPIC_CAPACITY: usize = 256;

#[derive(Default)]
pub struct MemoryBus {
  topics: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl MemoryBus {
  pub fn new() -> Self {
    Self::default()
  }

  fn topic(&self, name: &str) -> broadcast::Sender<Envelope> {
    let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
    topics
      .entry(name.to_string())
      .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
      .clone()
  }

  pub fn sink(&self, topic: &str) -> MemorySink {
    MemorySink {
      sender: Some(self.topic(topic)),
      topic: topic.to_string(),
    }
  }

  pub fn source(&self, topic: &str) -> MemorySource {
    MemorySource {
      receiver: self.topic(topic).subscribe(),
    }
  }

  /// Drop the bus side of a topic. Once every sink on it is gone too, its
  /// sources observe end-of-stream.
  pub fn drop_topic(&self, name: &str) {
    let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
    topics.remove(name);
  }
}

pub struct MemorySink {
  sender: Option<broadcast::Sender<Envelope>>,
  topic: String,
}

#[async_trait]
impl MessageSink for MemorySink {
  async fn publish(&self, envelope: Envelope) -> Result<(), TransportError> {
    match &self.sender {
      // A send error only means nobody is subscribed; the message is
      // dropped exactly as an unread log entry would be.
      Some(sender) => {
        if sender.send(envelope).is_err() {
          trace!(topic = %self.topic, "no subscribers, message dropped");
        }
        Ok(())
      }
      None => Err(TransportError::Publish(format!("sink for {} already closed", self.topic))),
    }
  }

  fn close(&mut self) -> Result<(), TransportError> {
    self.sender = None;
    Ok(())
  }
}

pub struct MemorySource {
  receiver: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl MessageSource for MemorySource {
  async fn next(&mut self, wait: Duration) -> Result<Option<Envelope>, TransportError> {
    match tokio::time::timeout(wait, self.receiver.recv()).await {
      Err(_) => Ok(None),
      Ok(Ok(envelope)) => Ok(Some(envelope)),
      Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
        trace!(skipped, "memory source lagged");
        Ok(None)
      }
      Ok(Err(broadcast::error::RecvError::Closed)) => Err(TransportError::EndOfStream),
    }
  }

  fn close(&mut self) -> Result<(), TransportError> {
    Ok(())
  }
}
