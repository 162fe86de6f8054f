//! Service configuration.
//!
//! Built once at startup (flags/env) and passed by reference into each
//! component constructor. Nothing in here is globally mutable.

use std::time::Duration;

/// Top-level configuration for a recipeline service process.
#[derive(Debug, Clone, Default)]
pub struct Config {
  pub kafka: KafkaConfig,
  pub nutrition: NutritionConfig,
}

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
  /// Comma-separated broker list, e.g. "localhost:9092,localhost:9093".
  pub brokers: String,
}

impl KafkaConfig {
  pub fn new(brokers: impl Into<String>) -> Self {
    Self { brokers: brokers.into() }
  }

  /// Individual broker addresses.
  pub fn broker_list(&self) -> Vec<&str> {
    self.brokers.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
  }
}

impl Default for KafkaConfig {
  fn default() -> Self {
    Self {
      brokers: "localhost:9092".to_string(),
    }
  }
}

/// Thresholds and timing for the nutrition aggregation workflow.
#[derive(Debug, Clone)]
pub struct NutritionConfig {
  /// Unknown-ingredient rate above which no result is produced.
  pub fail_threshold: f64,
  /// Unknown-ingredient rate above which the result is flagged inaccurate.
  pub inaccurate_threshold: f64,
  /// Overall budget for resolving all of one recipe's ingredients.
  pub recipe_timeout: Duration,
  /// Bound on a single blocking read, so cancellation is observed promptly.
  pub read_wait: Duration,
}

impl Default for NutritionConfig {
  fn default() -> Self {
    Self {
      fail_threshold: 0.5,
      inaccurate_threshold: 0.2,
      recipe_timeout: Duration::from_secs(30),
      read_wait: Duration::from_millis(500),
    }
  }
}
