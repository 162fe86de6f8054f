//! Broker wiring for the nutrition workflow.

use crate::service::NutritionService;
use crate::worker::{LookupSession, RecipeWorker, SessionFactory};
use messaging::controller::Controller;
use messaging::error::TransportError;
use messaging::kafka::{KafkaSink, KafkaSource};
use recipeline_core::config::Config;
use recipeline_core::topics;
use std::sync::Arc;
use uuid::Uuid;

const RECIPES_GROUP: &str = "nutrition-facts-service-recipes";
const INGREDIENTS_GROUP_PREFIX: &str = "nutrition-facts-service-ingredients";

/// Opens one fresh consumer/producer trio per fan-out. The response
/// consumer joins a throwaway group with a unique suffix: every waiter has
/// to observe all response traffic, so concurrent fan-outs must never
/// split a consumer group between them.
pub struct KafkaSessionFactory {
  brokers: String,
}

impl KafkaSessionFactory {
  pub fn new(brokers: impl Into<String>) -> Self {
    Self { brokers: brokers.into() }
  }
}

impl SessionFactory for KafkaSessionFactory {
  fn open(&self) -> Result<LookupSession, TransportError> {
    let group = format!("{INGREDIENTS_GROUP_PREFIX}-{}", Uuid::new_v4());
    Ok(LookupSession {
      requests: Box::new(KafkaSink::new(&self.brokers, topics::INGREDIENTS_REQ)?),
      responses: Box::new(KafkaSource::from_latest(&self.brokers, &group, topics::INGREDIENTS)?),
      results: Box::new(KafkaSink::new(&self.brokers, topics::NUTRITION_FACTS)?),
    })
  }
}

/// Assemble the nutrition controller against a Kafka broker.
pub fn controller(config: &Config) -> Result<Controller, TransportError> {
  let recipes = KafkaSource::new(&config.kafka.brokers, RECIPES_GROUP, topics::RECIPES)?;
  let worker = RecipeWorker::new(
    NutritionService::new(&config.nutrition),
    Box::new(recipes),
    Arc::new(KafkaSessionFactory::new(&config.kafka.brokers)),
    &config.nutrition,
  );
  Ok(Controller::new(vec![Box::new(worker)]))
}
