//! The message envelope and the response-matching policy.

use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Header carrying the correlation token on token-based workflows.
pub const CORRELATION_HEADER: &str = "correlation_id";

/// One message as it travels over the log: a partitioning/routing key, an
/// opaque serialized payload and an optional correlation token. Immutable
/// once published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
  pub key: String,
  pub payload: Vec<u8>,
  pub correlation_id: Option<String>,
}

impl Envelope {
  pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
    Self {
      key: key.into(),
      payload,
      correlation_id: None,
    }
  }

  pub fn with_token(mut self, token: impl Into<String>) -> Self {
    self.correlation_id = Some(token.into());
    self
  }

  /// Deserialize the payload as JSON.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
    serde_json::from_slice(&self.payload)
  }
}

/// How a waiter recognizes its response on a shared topic.
///
/// `Token` is exact equality against the `correlation_id` header and is
/// preferred. `Key` is equality against the message key, kept for the
/// workflows that predate tokens; two concurrent requests sharing a key
/// will collide, which those workflows accept as best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
  Token(String),
  Key(String),
}

impl Correlation {
  /// A fresh random token for a new request/response exchange.
  pub fn new_token() -> Self {
    Self::Token(Uuid::new_v4().to_string())
  }

  pub fn matches(&self, envelope: &Envelope) -> bool {
    match self {
      Self::Token(token) => envelope.correlation_id.as_deref() == Some(token.as_str()),
      Self::Key(key) => envelope.key == *key,
    }
  }
}
