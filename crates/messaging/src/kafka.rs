//! Kafka-backed transport.
//!
//! Thin wrappers over `rdkafka`'s streaming consumer and future producer,
//! mapping broker messages to [`Envelope`]s and broker failures to
//! [`TransportError`]s.

use crate::envelope::{CORRELATION_HEADER, Envelope};
use crate::error::TransportError;
use crate::transport::{MessageSink, MessageSource};
use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::warn;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// A consumer-group subscription on one topic.
pub struct KafkaSource {
  consumer: StreamConsumer,
  topic: String,
}

impl KafkaSource {
  /// Join `group` on `topic`, starting from the earliest uncommitted offset.
  pub fn new(brokers: &str, group: &str, topic: &str) -> Result<Self, TransportError> {
    Self::with_offset_reset(brokers, group, topic, "earliest")
  }

  /// Join `group` on `topic`, reading only messages published after the
  /// subscription. Used by response waiters with throwaway group ids, so
  /// old response traffic is not replayed at them.
  pub fn from_latest(brokers: &str, group: &str, topic: &str) -> Result<Self, TransportError> {
    Self::with_offset_reset(brokers, group, topic, "latest")
  }

  fn with_offset_reset(brokers: &str, group: &str, topic: &str, reset: &str) -> Result<Self, TransportError> {
    let consumer: StreamConsumer = ClientConfig::new()
      .set("bootstrap.servers", brokers)
      .set("group.id", group)
      .set("auto.offset.reset", reset)
      .set("session.timeout.ms", "6000")
      .create()?;
    consumer.subscribe(&[topic])?;
    Ok(Self {
      consumer,
      topic: topic.to_string(),
    })
  }

  pub fn topic(&self) -> &str {
    &self.topic
  }
}

#[async_trait]
impl MessageSource for KafkaSource {
  async fn next(&mut self, wait: Duration) -> Result<Option<Envelope>, TransportError> {
    match tokio::time::timeout(wait, self.consumer.recv()).await {
      Err(_) => Ok(None),
      Ok(Ok(message)) => Ok(Some(envelope_from(&message))),
      Ok(Err(error)) if is_terminal(&error) => Err(TransportError::EndOfStream),
      Ok(Err(error)) => Err(TransportError::Kafka(error)),
    }
  }

  fn close(&mut self) -> Result<(), TransportError> {
    self.consumer.unsubscribe();
    Ok(())
  }
}

/// A producer bound to one topic.
pub struct KafkaSink {
  producer: FutureProducer,
  topic: String,
}

impl KafkaSink {
  pub fn new(brokers: &str, topic: &str) -> Result<Self, TransportError> {
    let producer: FutureProducer = ClientConfig::new()
      .set("bootstrap.servers", brokers)
      .set("message.timeout.ms", "5000")
      .create()?;
    Ok(Self {
      producer,
      topic: topic.to_string(),
    })
  }

  pub fn topic(&self) -> &str {
    &self.topic
  }
}

#[async_trait]
impl MessageSink for KafkaSink {
  async fn publish(&self, envelope: Envelope) -> Result<(), TransportError> {
    let mut record = FutureRecord::to(&self.topic).key(&envelope.key).payload(&envelope.payload);
    if let Some(token) = &envelope.correlation_id {
      record = record.headers(OwnedHeaders::new().insert(Header {
        key: CORRELATION_HEADER,
        value: Some(token.as_bytes()),
      }));
    }

    self
      .producer
      .send(record, PUBLISH_TIMEOUT)
      .await
      .map(|_| ())
      .map_err(|(error, _)| TransportError::Kafka(error))
  }

  fn close(&mut self) -> Result<(), TransportError> {
    self.producer.flush(PUBLISH_TIMEOUT)?;
    Ok(())
  }
}

/// Create any missing topics with a single partition, retrying the initial
/// broker contact a few times so services can start before the broker.
pub async fn ensure_topics(brokers: &str, topics: &[&str]) -> Result<(), TransportError> {
  let admin: AdminClient<DefaultClientContext> =
    ClientConfig::new().set("bootstrap.servers", brokers).create()?;
  let requests: Vec<NewTopic<'_>> = topics
    .iter()
    .map(|topic| NewTopic::new(topic, 1, TopicReplication::Fixed(1)))
    .collect();
  let options = AdminOptions::new();

  let mut last_error = None;
  for attempt in 0..5u32 {
    if attempt > 0 {
      tokio::time::sleep(Duration::from_secs(3)).await;
    }
    match admin.create_topics(requests.iter(), &options).await {
      Ok(results) => {
        for result in results {
          if let Err((topic, code)) = result {
            if code != RDKafkaErrorCode::TopicAlreadyExists {
              warn!(topic = %topic, code = ?code, "could not create topic");
            }
          }
        }
        return Ok(());
      }
      Err(error) => {
        warn!(error = %error, attempt, "topic creation failed, retrying");
        last_error = Some(error);
      }
    }
  }
  Err(
    last_error
      .map(TransportError::Kafka)
      .unwrap_or_else(|| TransportError::Publish("topic creation failed".to_string())),
  )
}

fn envelope_from(message: &BorrowedMessage<'_>) -> Envelope {
  let key = message
    .key()
    .map(|key| String::from_utf8_lossy(key).into_owned())
    .unwrap_or_default();
  let payload = message.payload().map(<[u8]>::to_vec).unwrap_or_default();

  let mut envelope = Envelope::new(key, payload);
  if let Some(headers) = message.headers() {
    for header in headers.iter() {
      if header.key == CORRELATION_HEADER {
        if let Some(value) = header.value {
          envelope.correlation_id = Some(String::from_utf8_lossy(value).into_owned());
        }
      }
    }
  }
  envelope
}

fn is_terminal(error: &KafkaError) -> bool {
  matches!(
    error,
    KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal)
      | KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerDestroy)
  )
}
